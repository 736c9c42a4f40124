//! Dataset validation logic.

use std::collections::HashSet;

use crate::error::{DataError, DataResult};
use crate::indexing::LocationIndex;
use crate::model::{Flow, Location};

/// What to do with a flow whose origin or dest is not a known location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingLocationPolicy {
    /// Remove the flow before aggregation and keep it in `dropped_flows`.
    #[default]
    Drop,
    /// Fail the dataset build.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub missing_location: MissingLocationPolicy,
    /// Collect duplicate-flow reports (off when `ignore.errors` is set).
    pub report_duplicates: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            missing_location: MissingLocationPolicy::default(),
            report_duplicates: true,
        }
    }
}

/// Location ids must be unique within a dataset.
pub(crate) fn validate_locations(locations: &[Location]) -> DataResult<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(locations.len());
    for loc in locations {
        if !seen.insert(loc.id.as_str()) {
            return Err(DataError::DuplicateLocationId { id: loc.id.clone() });
        }
    }
    Ok(())
}

/// Split flows into (kept, dropped) according to the policy.
pub(crate) fn check_flow_refs(
    index: &LocationIndex,
    flows: Vec<Flow>,
    policy: MissingLocationPolicy,
) -> DataResult<(Vec<Flow>, Vec<Flow>)> {
    let mut kept = Vec::with_capacity(flows.len());
    let mut dropped = Vec::new();

    for flow in flows {
        let missing = [&flow.origin, &flow.dest]
            .into_iter()
            .find(|id| !index.contains(id.as_str()))
            .cloned();
        match (missing, policy) {
            (None, _) => kept.push(flow),
            (Some(_), MissingLocationPolicy::Drop) => dropped.push(flow),
            (Some(missing), MissingLocationPolicy::Error) => {
                return Err(DataError::MissingLocation {
                    origin: flow.origin,
                    dest: flow.dest,
                    missing,
                });
            }
        }
    }

    if !dropped.is_empty() {
        tracing::warn!(
            flows = dropped.len(),
            "dropped flows referring to unknown locations"
        );
    }
    Ok((kept, dropped))
}
