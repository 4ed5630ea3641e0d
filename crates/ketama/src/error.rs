//! Error types for ring operations.
//!
//! Every failure is returned to the caller as a value; the ring has no
//! fatal path of its own.

use thiserror::Error;

/// Errors that can occur while mutating or querying a ring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("invalid weight {weight} for node {name:?}: weight must be at least 1")]
    InvalidWeight { name: String, weight: u32 },

    #[error("node name must not be empty")]
    InvalidNodeName,

    #[error("node {0:?} not found")]
    NodeNotFound(String),

    #[error("ring has no nodes")]
    EmptyRing,

    #[error("points per weight unit must be at least 1")]
    InvalidPointDensity,

    #[error("virtual point count overflows: {points_per_weight} points x {total_weight} weight")]
    TooManyPoints {
        points_per_weight: u32,
        total_weight: u64,
    },
}

/// Result type for ring operations.
pub type Result<T> = std::result::Result<T, RingError>;
