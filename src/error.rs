use thiserror::Error;

use crate::dataset::DType;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("{dataset} has dimensions {found:?}, expected exactly {expected:?}")]
    DimensionMismatch {
        dataset: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("rank counts for variable '{variable}' must be int64, got {dtype}")]
    NonIntegerCounts { variable: String, dtype: DType },

    #[error("variable '{variable}' has no dimension '{dim}'")]
    MissingDimension { variable: String, dim: String },

    #[error("no coordinate for dimension '{dim}'")]
    MissingCoordinate { dim: String },

    #[error("dimension '{dim}' has length {found}, expected {expected}")]
    CoordinateLength {
        dim: String,
        expected: usize,
        found: usize,
    },

    #[error("{found} dimension names given for an array of rank {expected}")]
    DimensionCount { expected: usize, found: usize },

    #[error("dimension '{dim}' listed more than once")]
    DuplicateDimension { dim: String },

    #[error("label {label} appears more than once along '{dim}'")]
    DuplicateLabel { dim: String, label: String },

    #[error("label {label} not found along '{dim}'")]
    LabelNotFound { dim: String, label: String },

    #[error("datasets carry different variables: {expected:?} vs {found:?}")]
    VariableMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
