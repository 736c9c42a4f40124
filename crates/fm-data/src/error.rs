//! Data-specific error types.

use fm_core::{FmError, LocationId};

pub type DataResult<T> = Result<T, DataError>;

/// Dataset construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// Two locations share the same id.
    DuplicateLocationId { id: LocationId },

    /// A location row has no id.
    MissingLocationId { row: usize },

    /// A location coordinate did not parse to a finite number.
    InvalidCoordinate {
        id: LocationId,
        field: &'static str,
        value: String,
    },

    /// A flow refers to a location that is not in the dataset.
    MissingLocation {
        origin: LocationId,
        dest: LocationId,
        missing: LocationId,
    },

    /// ID not found in the location index.
    IdNotFound { id: LocationId },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::DuplicateLocationId { id } => {
                write!(f, "Location id {} appears more than once", id)
            }
            DataError::MissingLocationId { row } => {
                write!(f, "Location row {} has no id", row)
            }
            DataError::InvalidCoordinate { id, field, value } => {
                write!(f, "Location {} has invalid {}: {:?}", id, field, value)
            }
            DataError::MissingLocation {
                origin,
                dest,
                missing,
            } => {
                write!(
                    f,
                    "Flow {} → {} refers to unknown location {}",
                    origin, dest, missing
                )
            }
            DataError::IdNotFound { id } => {
                write!(f, "{} not found in location index", id)
            }
        }
    }
}

impl std::error::Error for DataError {}

impl From<DataError> for FmError {
    fn from(err: DataError) -> Self {
        FmError::Invariant {
            what: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_ids() {
        let err = DataError::MissingLocation {
            origin: "A".into(),
            dest: "Z".into(),
            missing: "Z".into(),
        };
        assert_eq!(err.to_string(), "Flow A → Z refers to unknown location Z");

        let core: FmError = err.into();
        assert!(matches!(core, FmError::Invariant { .. }));
    }
}
