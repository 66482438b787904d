//! Error types for gaussmix operations.
//!
//! Provides rich error context for library consumers.

use thiserror::Error;

/// Main error type for gaussmix operations.
///
/// Non-convergence within the iteration budget is *not* an error; it is
/// reported through [`FitStatus`](crate::mixture::FitStatus).
///
/// # Examples
///
/// ```
/// use gaussmix::error::GaussMixError;
///
/// let err = GaussMixError::invalid_parameter("tol", -1.0, "> 0");
/// assert!(err.to_string().contains("Invalid parameter"));
/// ```
#[derive(Debug, Error)]
pub enum GaussMixError {
    /// Input matrix has an unusable shape for the requested model.
    #[error("Invalid shape for {context}: expected {expected}, got {actual}")]
    InvalidShape {
        /// What was being checked
        context: String,
        /// Expected shape description
        expected: String,
        /// Actual shape found
        actual: String,
    },

    /// Invalid hyperparameter or input value.
    #[error("Invalid parameter: {param} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A covariance stayed singular after the reinitialisation budget ran out.
    #[error(
        "Numerical degeneracy in component {component} after {retries} reinitializations: {reason}"
    )]
    NumericalDegeneracy {
        /// Offending component index
        component: usize,
        /// Reinitialisations performed before giving up
        retries: usize,
        /// What went wrong
        reason: String,
    },

    /// Model queried before `fit()`.
    #[error("Model not fitted. Call fit() first.")]
    NotFitted,

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GaussMixError {
    /// Create an invalid parameter error from any displayable value.
    #[must_use]
    pub fn invalid_parameter(param: &str, value: impl std::fmt::Display, constraint: &str) -> Self {
        Self::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a shape error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::InvalidShape {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<serde_json::Error> for GaussMixError {
    fn from(err: serde_json::Error) -> Self {
        GaussMixError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, GaussMixError>;
