//! Incremental dataset builder.

use fm_core::{LocationId, LocationIdx, Real, parse_finite};

use crate::dedupe::{DedupeOptions, DuplicateFlow, sum_duplicate_flows};
use crate::error::DataResult;
use crate::indexing::LocationIndex;
use crate::model::{Flow, Location, RawFlow, RawLocation};
use crate::validate::{self, ValidationPolicy};

/// Builder for assembling a dataset from locations and flows.
///
/// Use `add_location`/`add_flow` (or the raw-row variants), then call
/// `build()` to sum duplicates, validate references and freeze the result.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    locations: Vec<Location>,
    flows: Vec<Flow>,
    incomplete_rows: usize,
    policy: ValidationPolicy,
}

impl DatasetBuilder {
    /// Create a new empty builder with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Add a location and return its position in the dataset.
    pub fn add_location(
        &mut self,
        id: impl Into<LocationId>,
        name: impl Into<String>,
        lon: Real,
        lat: Real,
    ) -> LocationIdx {
        self.push_location(Location::new(id, name, lon, lat))
    }

    pub fn push_location(&mut self, location: Location) -> LocationIdx {
        let idx = LocationIdx::from_index(self.locations.len() as u32);
        self.locations.push(location);
        idx
    }

    /// Parse and add location rows. Fails on the first malformed row.
    pub fn add_raw_locations(&mut self, rows: &[RawLocation]) -> DataResult<()> {
        let first_row = self.locations.len();
        for (i, raw) in rows.iter().enumerate() {
            let loc = Location::from_raw(raw, first_row + i)?;
            self.locations.push(loc);
        }
        Ok(())
    }

    /// Add a flow. Repeated (origin, dest) pairs are summed at build time.
    pub fn add_flow(
        &mut self,
        origin: impl Into<LocationId>,
        dest: impl Into<LocationId>,
        count: Real,
    ) {
        self.flows.push(Flow::new(origin, dest, count));
    }

    /// Add flow rows. Rows without origin or dest are skipped; unparsable
    /// counts are kept as NaN and contribute 0 to their pair's sum.
    pub fn add_raw_flows(&mut self, rows: &[RawFlow]) {
        for row in rows {
            match (row.origin.as_deref(), row.dest.as_deref()) {
                (Some(origin), Some(dest)) => {
                    let count = row
                        .count
                        .as_deref()
                        .and_then(parse_finite)
                        .unwrap_or(Real::NAN);
                    self.add_flow(origin, dest, count);
                }
                _ => self.incomplete_rows += 1,
            }
        }
    }

    /// Build and validate the dataset.
    pub fn build(self) -> DataResult<Dataset> {
        validate::validate_locations(&self.locations)?;

        let summed = sum_duplicate_flows(
            &self.flows,
            DedupeOptions {
                report_duplicates: self.policy.report_duplicates,
            },
        );

        let index = LocationIndex::from_locations(&self.locations);
        let (flows, dropped_flows) =
            validate::check_flow_refs(&index, summed.flows, self.policy.missing_location)?;

        tracing::debug!(
            locations = self.locations.len(),
            flows = flows.len(),
            duplicates = summed.duplicates.len(),
            dropped = dropped_flows.len(),
            "dataset built"
        );

        Ok(Dataset {
            locations: self.locations,
            flows,
            index,
            duplicates: summed.duplicates,
            dropped_flows,
            incomplete_rows: self.incomplete_rows,
        })
    }
}

/// A validated, immutable set of locations and de-duplicated flows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    locations: Vec<Location>,
    flows: Vec<Flow>,
    index: LocationIndex,
    duplicates: Vec<DuplicateFlow>,
    dropped_flows: Vec<Flow>,
    incomplete_rows: usize,
}

impl Dataset {
    /// Convenience for the common "two sheets" case.
    pub fn from_rows(
        locations: &[RawLocation],
        flows: &[RawFlow],
        policy: ValidationPolicy,
    ) -> DataResult<Self> {
        let mut builder = DatasetBuilder::with_policy(policy);
        builder.add_raw_locations(locations)?;
        builder.add_raw_flows(flows);
        builder.build()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Flows with unique (origin, dest) pairs and known endpoints.
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    /// Pairs that occurred more than once in the input.
    pub fn duplicates(&self) -> &[DuplicateFlow] {
        &self.duplicates
    }

    /// Flows removed because an endpoint was unknown.
    pub fn dropped_flows(&self) -> &[Flow] {
        &self.dropped_flows
    }

    /// Flow rows skipped for lacking an origin or a dest.
    pub fn incomplete_rows(&self) -> usize {
        self.incomplete_rows
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.index
            .get(id)
            .map(|idx| &self.locations[idx.index() as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::validate::MissingLocationPolicy;

    #[test]
    fn builder_basic() {
        let mut builder = DatasetBuilder::new();
        let a = builder.add_location("A", "Alpha", 0.0, 0.0);
        let b = builder.add_location("B", "Beta", 1.0, 1.0);
        builder.add_flow("A", "B", 1.0);

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(builder.locations.len(), 2);
        assert_eq!(builder.flows.len(), 1);
    }

    #[test]
    fn builder_sums_duplicates_and_drops_unknown() {
        let mut builder = DatasetBuilder::new();
        builder.add_location("A", "Alpha", 0.0, 0.0);
        builder.add_location("B", "Beta", 1.0, 1.0);
        builder.add_flow("A", "B", 1.0);
        builder.add_flow("A", "B", 2.0);
        builder.add_flow("B", "Z", 9.0);

        let dataset = builder.build().unwrap();
        assert_eq!(dataset.flows(), &[Flow::new("A", "B", 3.0)]);
        assert_eq!(dataset.duplicates().len(), 1);
        assert_eq!(dataset.dropped_flows(), &[Flow::new("B", "Z", 9.0)]);
        assert_eq!(dataset.location("B").unwrap().name, "Beta");
    }

    #[test]
    fn strict_policy_fails_on_unknown_location() {
        let mut builder = DatasetBuilder::with_policy(ValidationPolicy {
            missing_location: MissingLocationPolicy::Error,
            report_duplicates: true,
        });
        builder.add_location("A", "Alpha", 0.0, 0.0);
        builder.add_flow("A", "Z", 1.0);
        assert!(matches!(
            builder.build().unwrap_err(),
            DataError::MissingLocation { .. }
        ));
    }

    #[test]
    fn from_rows_parses_both_sheets() {
        let locations = vec![
            RawLocation::new("A", "Alpha", "0", "0"),
            RawLocation::new("B", "", "1", "1"),
        ];
        let flows = vec![
            RawFlow::new("A", "B", "3"),
            RawFlow::new("A", "B", "4"),
            RawFlow::new("A", "B", "x"),
            RawFlow {
                dest: None,
                ..RawFlow::new("A", "", "1")
            },
        ];
        let dataset = Dataset::from_rows(&locations, &flows, ValidationPolicy::default()).unwrap();
        assert_eq!(dataset.flows(), &[Flow::new("A", "B", 7.0)]);
        assert_eq!(dataset.duplicates()[0].records, 3);
        assert_eq!(dataset.incomplete_rows(), 1);
        assert_eq!(dataset.location("B").unwrap().name, "B");
    }
}
