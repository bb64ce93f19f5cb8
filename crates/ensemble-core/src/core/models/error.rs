use super::ids::ConformationId;
use thiserror::Error;

/// Errors raised while validating or mutating a [`ConformationSet`](super::ensemble::ConformationSet).
///
/// Every variant is produced before any internal array is touched, so a failed call
/// leaves the set exactly as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnsembleError {
    #[error("Invalid coordinate shape: expected {expected}, found {found}")]
    Shape { expected: String, found: String },

    #[error("Atom count mismatch: the ensemble holds {expected} atoms, input has {found}")]
    AtomCountMismatch { expected: usize, found: usize },

    #[error("Non-finite value in {context} cannot be stored as a coordinate")]
    NonFinite { context: &'static str },

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Weight batch holds {found} frames but the coordinate batch holds {expected}")]
    WeightCountMismatch { expected: usize, found: usize },

    #[error("Conformation index {index} is out of range for an ensemble of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Conformation index {0} was given more than once")]
    DuplicateIndex(usize),

    #[error("Range {start}..{end} is not a valid slice of an ensemble of {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Conformation {0:?} has been removed from its ensemble")]
    Detached(ConformationId),

    #[error("Coordinate batch contains no frames")]
    EmptyBatch,
}
