//! Membership change notifications consumed by the ring.

use crate::error::ClusterResult;
use ketama::HashRing;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A change in the live node set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MembershipEvent {
    /// A node joined, or changed its weight.
    NodeUp { name: String, weight: u32 },
    /// A node's liveness session ended.
    NodeDown { name: String },
}

impl MembershipEvent {
    pub fn node_up(name: impl Into<String>, weight: u32) -> Self {
        Self::NodeUp {
            name: name.into(),
            weight,
        }
    }

    pub fn node_down(name: impl Into<String>) -> Self {
        Self::NodeDown { name: name.into() }
    }

    /// Name of the node the event is about.
    pub fn name(&self) -> &str {
        match self {
            Self::NodeUp { name, .. } | Self::NodeDown { name } => name,
        }
    }

    /// Apply the event to `ring`. The ring is left dirty; the caller
    /// decides when to bake.
    pub fn apply(&self, ring: &HashRing) -> ClusterResult<()> {
        match self {
            Self::NodeUp { name, weight } => {
                ring.add_node(name, *weight)?;
                info!(node = %name, weight, "node up");
            }
            Self::NodeDown { name } => {
                ring.remove_node(name)?;
                info!(node = %name, "node down");
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for MembershipEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeUp { name, weight } => write!(f, "up {}(weight={})", name, weight),
            Self::NodeDown { name } => write!(f, "down {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use ketama::{RingError, RingState};

    #[test]
    fn test_apply_up_and_down() {
        let ring = HashRing::new(10).unwrap();
        MembershipEvent::node_up("node1", 2).apply(&ring).unwrap();
        assert_eq!(ring.weight("node1"), Some(2));
        assert_eq!(ring.state(), RingState::Dirty);

        MembershipEvent::node_down("node1").apply(&ring).unwrap();
        assert_eq!(ring.state(), RingState::Empty);
    }

    #[test]
    fn test_apply_down_unknown_node() {
        let ring = HashRing::new(10).unwrap();
        let err = MembershipEvent::node_down("ghost").apply(&ring).unwrap_err();
        assert_eq!(
            err,
            ClusterError::Ring(RingError::NodeNotFound("ghost".into()))
        );
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_string(&MembershipEvent::node_up("node1", 3)).unwrap();
        assert_eq!(json, r#"{"type":"node_up","name":"node1","weight":3}"#);

        let event: MembershipEvent =
            serde_json::from_str(r#"{"type":"node_down","name":"node1"}"#).unwrap();
        assert_eq!(event, MembershipEvent::node_down("node1"));
        assert_eq!(event.to_string(), "down node1");
    }
}
