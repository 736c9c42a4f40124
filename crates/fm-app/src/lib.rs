//! Coordinating layer for flowmap.
//!
//! Holds loading state for the two input sheets, rebuilds layers data when
//! inputs change, and runs the pipeline off-thread with stale results
//! discarded. Nothing in here draws; the render side consumes the snapshots.

pub mod config;
pub mod error;
pub mod report;
pub mod store;
pub mod throttle;
pub mod viewport;
pub mod worker;

// Re-export key types for convenience
pub use config::{Config, ConfigProp, ConfigPropName};
pub use error::{AppError, AppResult};
pub use report::{MAX_NUM_OF_IDS_IN_ERROR, duplicate_flows_message};
pub use store::{AppStore, LoadingState, LoadingStatus};
pub use throttle::{Throttle, ThrottleConfig};
pub use viewport::{ViewportProps, viewport_for_locations};
pub use worker::{LayersRequest, LayersResponse, LayersWorker};
