//! Error types shared by the clustering engines and the allocation code.

use thiserror::Error;

/// Result type for clustering and allocation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller before (or instead of) producing a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A run was configured with parameters it cannot honour
    /// (`k > n`, `max_iterations < 1`, bad seed indices, empty data, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two vectors handed to a distance function have different lengths.
    #[error("vector length mismatch: {left} != {right}")]
    LengthMismatch { left: usize, right: usize },

    /// A ballot cannot be normalized into a weight vector.
    #[error("invalid ballot {ballot}: {reason}")]
    InvalidBallot { ballot: usize, reason: String },

    /// A cluster lost all of its members and the run was told not to recover.
    #[error("cluster {0} has no members")]
    DegenerateCluster(usize),
}

impl Error {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }
}
