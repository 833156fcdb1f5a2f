//! Error types for rrt_navigation

use thiserror::Error;

/// Main error type for planning and navigation
#[derive(Debug, Error)]
pub enum NavError {
    /// The sampling budget ran out before the tree reached the goal.
    /// Recoverable: retrying draws a fresh set of samples.
    #[error("planning failed: goal not reached after {iterations} iterations")]
    PlanningFailed {
        /// Number of iterations spent
        iterations: usize,
    },

    /// A path was requested before the tree reached the goal
    #[error("invalid path query: no path has been found yet")]
    InvalidPathQuery,

    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Raster buffer does not match the declared workspace size
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected number of cells
        expected: usize,
        /// Actual number of cells
        actual: usize,
    },

    /// Visualization error
    #[error("visualization error: {0}")]
    Visualization(String),
}

impl NavError {
    /// Creates an invalid parameter error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Whether a retry with fresh random samples may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, NavError::PlanningFailed { .. })
    }
}

/// Result type alias for navigation operations
pub type NavResult<T> = Result<T, NavError>;
