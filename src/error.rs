//! Error types for the localfit library.

use thiserror::Error;

/// Result type alias for fitting operations.
pub type Result<T> = std::result::Result<T, FitError>;

/// Errors that can occur while fitting or querying an estimator.
///
/// Only shape and usage violations are fatal. Numerically degenerate
/// situations (singular local windows, ill-conditioned kernel systems)
/// are recovered with documented fallbacks and never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,
}
