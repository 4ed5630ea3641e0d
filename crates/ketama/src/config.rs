//! Ring configuration.

use serde::{Deserialize, Serialize};

/// Virtual points generated per unit of node weight when none is given.
pub const DEFAULT_POINTS_PER_WEIGHT: u32 = 100;

/// Configuration fixed at ring construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Number of virtual points a node of weight 1 places on the ring.
    pub points_per_weight: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            points_per_weight: DEFAULT_POINTS_PER_WEIGHT,
        }
    }
}

impl RingConfig {
    pub fn new(points_per_weight: u32) -> Self {
        Self { points_per_weight }
    }
}

/// Serializable node description for tooling and static topologies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}
