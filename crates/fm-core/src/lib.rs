//! fm-core: stable foundation for flowmap.
//!
//! Contains:
//! - numeric (Real + tolerances + lenient number parsing)
//! - ids (location identifiers and compact location indices)
//! - error (shared error types)
//! - timing (opt-in phase timers reported through `tracing`)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FmError, FmResult};
pub use ids::*;
pub use numeric::*;
