//! Summation of flows that share the same (origin, dest) pair.

use std::collections::HashMap;

use fm_core::{LocationId, Real, parse_finite};

use crate::model::{Flow, RawFlow};

/// First record of an (origin, dest) group that had more than one row.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateFlow {
    pub origin: LocationId,
    pub dest: LocationId,
    /// Number of input rows that were summed into the group.
    pub records: usize,
    /// Count cell of the first row, as given.
    pub first_count: Option<Real>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupeOutcome {
    /// One flow per (origin, dest) pair, grouped by origin then dest in
    /// order of first appearance.
    pub flows: Vec<Flow>,
    /// Duplicated pairs, empty when reporting is suppressed.
    pub duplicates: Vec<DuplicateFlow>,
    /// Rows dropped for lacking an origin or a dest.
    pub incomplete_rows: usize,
}

impl DedupeOutcome {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeOptions {
    /// Collect duplicate reports. Turned off by the `ignore.errors` setting.
    pub report_duplicates: bool,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            report_duplicates: true,
        }
    }
}

/// Sum raw flow rows per (origin, dest) pair with default options.
pub fn dedupe_flows(rows: &[RawFlow]) -> DedupeOutcome {
    dedupe_flows_with(rows, DedupeOptions::default())
}

/// Sum raw flow rows per (origin, dest) pair.
///
/// Counts that do not parse to a finite number contribute 0. Rows without an
/// origin or a dest are dropped.
pub fn dedupe_flows_with(rows: &[RawFlow], options: DedupeOptions) -> DedupeOutcome {
    let mut incomplete_rows = 0;
    let records = rows.iter().filter_map(|row| {
        match (row.origin.as_deref(), row.dest.as_deref()) {
            (Some(origin), Some(dest)) => {
                Some((origin, dest, row.count.as_deref().and_then(parse_finite)))
            }
            _ => {
                incomplete_rows += 1;
                None
            }
        }
    });
    let mut outcome = sum_grouped(records, options);
    outcome.incomplete_rows = incomplete_rows;
    if outcome.incomplete_rows > 0 {
        tracing::debug!(
            rows = outcome.incomplete_rows,
            "dropped flow rows without origin or dest"
        );
    }
    outcome
}

/// Same grouping for already-typed flows. Non-finite counts contribute 0 and
/// give `first_count: None`, matching an unparsable cell on the raw-row path.
pub(crate) fn sum_duplicate_flows(flows: &[Flow], options: DedupeOptions) -> DedupeOutcome {
    let records = flows.iter().map(|f| {
        (
            f.origin.as_str(),
            f.dest.as_str(),
            Some(f.count).filter(|c| c.is_finite()),
        )
    });
    sum_grouped(records, options)
}

struct Group {
    origin: LocationId,
    dest: LocationId,
    sum: Real,
    records: usize,
    first_count: Option<Real>,
}

struct OriginGroup<'a> {
    dests: Vec<Group>,
    dest_index: HashMap<&'a str, usize>,
}

fn sum_grouped<'a, I>(records: I, options: DedupeOptions) -> DedupeOutcome
where
    I: IntoIterator<Item = (&'a str, &'a str, Option<Real>)>,
{
    let mut origins: Vec<OriginGroup<'a>> = Vec::new();
    let mut origin_index: HashMap<&'a str, usize> = HashMap::new();

    for (origin, dest, count) in records {
        let oi = *origin_index.entry(origin).or_insert_with(|| {
            origins.push(OriginGroup {
                dests: Vec::new(),
                dest_index: HashMap::new(),
            });
            origins.len() - 1
        });
        let og = &mut origins[oi];
        let di = *og.dest_index.entry(dest).or_insert_with(|| {
            og.dests.push(Group {
                origin: LocationId::from(origin),
                dest: LocationId::from(dest),
                sum: 0.0,
                records: 0,
                first_count: count,
            });
            og.dests.len() - 1
        });
        let group = &mut og.dests[di];
        group.records += 1;
        if let Some(c) = count {
            group.sum += c;
        }
    }

    let mut outcome = DedupeOutcome::default();
    for og in origins {
        for group in og.dests {
            if group.records > 1 && options.report_duplicates {
                outcome.duplicates.push(DuplicateFlow {
                    origin: group.origin.clone(),
                    dest: group.dest.clone(),
                    records: group.records,
                    first_count: group.first_count,
                });
            }
            outcome.flows.push(Flow {
                origin: group.origin,
                dest: group.dest,
                count: group.sum,
            });
        }
    }

    if outcome.has_duplicates() {
        tracing::warn!(
            pairs = outcome.duplicates.len(),
            "flows encountered more than once, counts were summed"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_valid_counts_and_reports_once() {
        let rows = vec![
            RawFlow::new("A", "B", "3"),
            RawFlow::new("A", "B", "4"),
            RawFlow::new("A", "B", "x"),
        ];
        let out = dedupe_flows(&rows);
        assert_eq!(out.flows, vec![Flow::new("A", "B", 7.0)]);
        assert_eq!(out.duplicates.len(), 1);
        assert_eq!(out.duplicates[0].origin.as_str(), "A");
        assert_eq!(out.duplicates[0].dest.as_str(), "B");
        assert_eq!(out.duplicates[0].records, 3);
        assert_eq!(out.duplicates[0].first_count, Some(3.0));
    }

    #[test]
    fn suppressed_reporting_keeps_sums() {
        let rows = vec![RawFlow::new("A", "B", "3"), RawFlow::new("A", "B", "4")];
        let out = dedupe_flows_with(
            &rows,
            DedupeOptions {
                report_duplicates: false,
            },
        );
        assert_eq!(out.flows, vec![Flow::new("A", "B", 7.0)]);
        assert!(out.duplicates.is_empty());
    }

    #[test]
    fn groups_by_origin_then_dest() {
        let rows = vec![
            RawFlow::new("A", "B", "1"),
            RawFlow::new("C", "A", "2"),
            RawFlow::new("A", "C", "3"),
            RawFlow::new("A", "B", "4"),
        ];
        let out = dedupe_flows(&rows);
        let pairs: Vec<(&str, &str, Real)> = out
            .flows
            .iter()
            .map(|f| (f.origin.as_str(), f.dest.as_str(), f.count))
            .collect();
        assert_eq!(pairs, vec![("A", "B", 5.0), ("A", "C", 3.0), ("C", "A", 2.0)]);
    }

    #[test]
    fn drops_rows_without_endpoints() {
        let rows = vec![
            RawFlow {
                origin: None,
                ..RawFlow::new("", "B", "1")
            },
            RawFlow {
                dest: None,
                ..RawFlow::new("A", "", "1")
            },
            RawFlow {
                count: None,
                ..RawFlow::new("A", "B", "")
            },
        ];
        let out = dedupe_flows(&rows);
        assert_eq!(out.incomplete_rows, 2);
        assert_eq!(out.flows, vec![Flow::new("A", "B", 0.0)]);
        assert!(out.duplicates.is_empty());
    }

    #[test]
    fn typed_flows_ignore_non_finite() {
        let flows = vec![
            Flow::new("A", "B", 2.0),
            Flow::new("A", "B", Real::NAN),
            Flow::new("A", "B", Real::INFINITY),
        ];
        let out = sum_duplicate_flows(&flows, DedupeOptions::default());
        assert_eq!(out.flows, vec![Flow::new("A", "B", 2.0)]);
        assert_eq!(out.duplicates[0].records, 3);
    }

    #[test]
    fn unparsable_first_count_is_none_on_both_paths() {
        let rows = vec![
            RawFlow::new("A", "B", "n/a"),
            RawFlow::new("A", "B", "5"),
        ];
        let raw = dedupe_flows(&rows);

        let mut builder = crate::builder::DatasetBuilder::new();
        builder.add_location("A", "A", 0.0, 0.0);
        builder.add_location("B", "B", 1.0, 1.0);
        builder.add_raw_flows(&rows);
        let dataset = builder.build().unwrap();

        assert_eq!(raw.duplicates[0].first_count, None);
        assert_eq!(dataset.duplicates(), raw.duplicates.as_slice());
        assert_eq!(dataset.flows(), raw.flows.as_slice());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn row_strategy() -> impl Strategy<Value = RawFlow> {
        let id = prop::sample::select(vec!["A", "B", "C", "D"]);
        let count = prop_oneof![
            (-100i32..100).prop_map(|c| c.to_string()),
            Just("x".to_string()),
            Just("".to_string()),
        ];
        (id.clone(), id, count).prop_map(|(o, d, c)| RawFlow::new(o, d, &c))
    }

    proptest! {
        #[test]
        fn pairs_are_unique_and_sums_preserved(rows in prop::collection::vec(row_strategy(), 0..40)) {
            let out = dedupe_flows(&rows);

            let mut seen = HashSet::new();
            for f in &out.flows {
                prop_assert!(seen.insert((f.origin.clone(), f.dest.clone())));
            }

            for f in &out.flows {
                let expected: Real = rows
                    .iter()
                    .filter(|r| r.origin.as_deref() == Some(f.origin.as_str())
                        && r.dest.as_deref() == Some(f.dest.as_str()))
                    .filter_map(|r| r.count.as_deref().and_then(parse_finite))
                    .sum();
                prop_assert_eq!(f.count, expected);
            }

            let dup_pairs = out.flows.len() + out.duplicates.iter().map(|d| d.records - 1).sum::<usize>();
            prop_assert_eq!(dup_pairs, rows.len());
        }
    }
}
