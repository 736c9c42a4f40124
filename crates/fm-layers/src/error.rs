//! Error types for layers preparation.

use fm_core::{FmError, LocationId};
use fm_data::DataError;
use thiserror::Error;

/// Structural problems with pipeline input. Numeric oddities (NaN counts,
/// empty domains) are not errors; they are floored or clamped instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayersError {
    #[error("Flow {origin} → {dest} refers to location {missing}, which has no centroid")]
    MissingCentroid {
        origin: LocationId,
        dest: LocationId,
        missing: LocationId,
    },

    #[error("Location {id} has a non-finite centroid")]
    NonFiniteCentroid { id: LocationId },

    #[error("Color palette is empty: {which}")]
    EmptyPalette { which: &'static str },

    #[error("Attribute {name} has {actual} values, expected {expected}")]
    AttributeLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid options: {0}")]
    Options(#[from] FmError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

pub type LayersResult<T> = Result<T, LayersError>;

impl From<LayersError> for FmError {
    fn from(e: LayersError) -> Self {
        match e {
            LayersError::Data(err) => err.into(),
            LayersError::Options(err) => err,
            other => FmError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}
