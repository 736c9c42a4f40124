//! Location and dataset totals.

use fm_core::{LocationIdx, Real, finite_or_zero};

use crate::indexing::LocationIndex;
use crate::model::{FlowLocation, FlowRecord};

/// Per-location sums, recomputed from scratch for every flow/location set.
///
/// Self-loops only count towards `within`; every other flow counts towards
/// `outgoing` of its origin and `incoming` of its dest.
#[derive(Debug, Clone, Default)]
pub struct LocationTotals {
    index: LocationIndex,
    incoming: Vec<Real>,
    outgoing: Vec<Real>,
    within: Vec<Real>,
    /// Flows whose origin or dest is not among the locations.
    unmatched_flows: usize,
}

impl LocationTotals {
    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn unmatched_flows(&self) -> usize {
        self.unmatched_flows
    }

    pub fn incoming(&self, id: &str) -> Real {
        self.lookup(&self.incoming, id)
    }

    pub fn outgoing(&self, id: &str) -> Real {
        self.lookup(&self.outgoing, id)
    }

    pub fn within(&self, id: &str) -> Real {
        self.lookup(&self.within, id)
    }

    /// Largest of |incoming|, |outgoing| and |within|; 0 for unknown ids.
    pub fn max_abs_total(&self, id: &str) -> Real {
        self.index
            .get(id)
            .map_or(0.0, |idx| self.max_abs_total_at(idx))
    }

    pub fn max_abs_total_at(&self, idx: LocationIdx) -> Real {
        let i = idx.index() as usize;
        self.incoming[i]
            .abs()
            .max(self.outgoing[i].abs())
            .max(self.within[i].abs())
    }

    /// Max-abs-total for every location in index order.
    pub fn max_abs_totals(&self) -> Vec<Real> {
        (0..self.index.len())
            .map(|i| self.max_abs_total_at(LocationIdx::from_index(i as u32)))
            .collect()
    }

    fn lookup(&self, values: &[Real], id: &str) -> Real {
        self.index
            .get(id)
            .map_or(0.0, |idx| values[idx.index() as usize])
    }
}

/// Compute incoming/outgoing/within totals for every location.
///
/// Locations that no flow refers to get zero totals. Non-finite magnitudes
/// count as 0.
pub fn calc_location_totals<L, F>(locations: &[L], flows: &[F]) -> LocationTotals
where
    L: FlowLocation,
    F: FlowRecord,
{
    let index = LocationIndex::from_locations(locations);
    let n = index.len();
    let mut incoming = vec![0.0; n];
    let mut outgoing = vec![0.0; n];
    let mut within = vec![0.0; n];
    let mut unmatched_flows = 0;

    for flow in flows {
        let magnitude = finite_or_zero(flow.magnitude());
        let origin = index.get(flow.origin_id().as_str());
        let dest = index.get(flow.dest_id().as_str());

        if flow.is_internal() {
            match origin {
                Some(o) => within[o.index() as usize] += magnitude,
                None => unmatched_flows += 1,
            }
            continue;
        }

        if origin.is_none() || dest.is_none() {
            unmatched_flows += 1;
        }
        if let Some(o) = origin {
            outgoing[o.index() as usize] += magnitude;
        }
        if let Some(d) = dest {
            incoming[d.index() as usize] += magnitude;
        }
    }

    LocationTotals {
        index,
        incoming,
        outgoing,
        within,
        unmatched_flows,
    }
}

/// Dataset-wide sums shown in the totals panel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowTotals {
    pub incoming_count: Real,
    pub outgoing_count: Real,
    pub internal_count: Real,
}

pub fn calc_flow_totals<F: FlowRecord>(flows: &[F]) -> FlowTotals {
    let mut totals = FlowTotals::default();
    for flow in flows {
        let magnitude = finite_or_zero(flow.magnitude());
        if flow.is_internal() {
            totals.internal_count += magnitude;
        } else {
            totals.incoming_count += magnitude;
            totals.outgoing_count += magnitude;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flow, Location};

    fn locations() -> Vec<Location> {
        vec![
            Location::new("A", "A", 0.0, 0.0),
            Location::new("B", "B", 1.0, 0.0),
            Location::new("C", "C", 2.0, 0.0),
        ]
    }

    #[test]
    fn self_loops_only_count_within() {
        let flows = vec![
            Flow::new("A", "B", 5.0),
            Flow::new("A", "A", 10.0),
            Flow::new("B", "A", 2.0),
        ];
        let totals = calc_location_totals(&locations(), &flows);

        assert_eq!(totals.outgoing("A"), 5.0);
        assert_eq!(totals.incoming("A"), 2.0);
        assert_eq!(totals.within("A"), 10.0);
        assert_eq!(totals.max_abs_total("A"), 10.0);

        assert_eq!(totals.incoming("B"), 5.0);
        assert_eq!(totals.outgoing("B"), 2.0);
        assert_eq!(totals.within("B"), 0.0);
    }

    #[test]
    fn untouched_locations_are_zero() {
        let totals = calc_location_totals(&locations(), &[Flow::new("A", "B", 1.0)]);
        assert_eq!(totals.incoming("C"), 0.0);
        assert_eq!(totals.max_abs_total("C"), 0.0);
        assert_eq!(totals.max_abs_total("nowhere"), 0.0);
        assert_eq!(totals.max_abs_totals(), vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn negative_magnitudes_use_absolute_value() {
        let flows = vec![Flow::new("A", "B", -8.0), Flow::new("C", "A", 3.0)];
        let totals = calc_location_totals(&locations(), &flows);
        assert_eq!(totals.outgoing("A"), -8.0);
        assert_eq!(totals.max_abs_total("A"), 8.0);
    }

    #[test]
    fn unmatched_and_non_finite() {
        let flows = vec![
            Flow::new("A", "Z", 4.0),
            Flow::new("A", "B", Real::NAN),
        ];
        let totals = calc_location_totals(&locations(), &flows);
        assert_eq!(totals.unmatched_flows(), 1);
        assert_eq!(totals.outgoing("A"), 4.0);
        assert_eq!(totals.incoming("B"), 0.0);
    }

    #[test]
    fn flow_totals_split_internal() {
        let flows = vec![
            Flow::new("A", "B", 5.0),
            Flow::new("A", "A", 10.0),
            Flow::new("B", "A", 2.0),
        ];
        let totals = calc_flow_totals(&flows);
        assert_eq!(totals.internal_count, 10.0);
        assert_eq!(totals.outgoing_count, 7.0);
        assert_eq!(totals.incoming_count, 7.0);
    }
}
