//! fm-data: data model and flow preparation for flowmap.
//!
//! Provides:
//! - Location / cluster / flow records and the `FlowLocation` capability
//! - Duplicate-flow summation with duplicate reporting
//! - Per-location incoming/outgoing/internal totals
//! - Stable location indexing for centroid lookup
//! - A validating dataset builder
//!
//! # Example
//!
//! ```
//! use fm_data::{DatasetBuilder, calc_location_totals};
//!
//! let mut builder = DatasetBuilder::new();
//! builder.add_location("A", "Alpha", 0.0, 0.0);
//! builder.add_location("B", "Beta", 1.0, 1.0);
//! builder.add_flow("A", "B", 3.0);
//! builder.add_flow("A", "B", 4.0);
//! let dataset = builder.build().unwrap();
//!
//! assert_eq!(dataset.flows().len(), 1);
//! assert_eq!(dataset.duplicates().len(), 1);
//!
//! let totals = calc_location_totals(dataset.locations(), dataset.flows());
//! assert_eq!(totals.outgoing("A"), 7.0);
//! ```

pub mod builder;
pub mod dedupe;
pub mod error;
pub mod indexing;
pub mod model;
pub mod totals;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::{Dataset, DatasetBuilder};
pub use dedupe::{DedupeOptions, DedupeOutcome, DuplicateFlow, dedupe_flows, dedupe_flows_with};
pub use error::{DataError, DataResult};
pub use indexing::LocationIndex;
pub use model::{
    ClusterNode, Flow, FlowLocation, FlowRecord, Location, MapNode, RawFlow, RawLocation,
};
pub use totals::{FlowTotals, LocationTotals, calc_flow_totals, calc_location_totals};
pub use validate::{MissingLocationPolicy, ValidationPolicy};
