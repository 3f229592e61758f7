//! Error types for the isoimpute crate

use thiserror::Error;

/// Result type alias for imputation operations
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum ImputeError {
    #[error("Column {0} has no observed values; neighbor averaging is undefined for it")]
    EmptyColumn(usize),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<ndarray::ShapeError> for ImputeError {
    fn from(err: ndarray::ShapeError) -> Self {
        ImputeError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
