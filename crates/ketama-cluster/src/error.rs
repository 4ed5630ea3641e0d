//! Error types for membership tracking.

use ketama::RingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("membership path {0:?} does not exist")]
    PathNotFound(String),

    #[error("membership path {0:?} has no members")]
    NoMembers(String),

    #[error("ring error: {0}")]
    Ring(#[from] RingError),
}

/// Result type for membership operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
