//! # Ketama
//!
//! Weighted consistent hashing. Keys are mapped onto a dynamic set of
//! named nodes so that each node receives a share of the keyspace
//! proportional to its weight, and adding or removing a node only remaps
//! the keys that node gains or loses.
//!
//! Every node places `points_per_weight * weight` virtual points on a
//! 32-bit ring. A key belongs to the first point at or after its own hash,
//! wrapping around past the largest point. Placement is a pure function
//! of the `{name, weight}` set, so independent processes holding the same
//! membership agree on every key without coordinating.
//!
//! Membership discovery and liveness live outside this crate; see
//! `ketama-cluster` for the event-driven adapter.

pub mod config;
pub mod error;
pub mod hash;
pub mod index;
pub mod registry;
pub mod ring;

pub use config::{NodeSpec, RingConfig, DEFAULT_POINTS_PER_WEIGHT};
pub use error::{Result, RingError};
pub use hash::{Md5Hasher, PointHasher};
pub use index::{VirtualPoint, VirtualPointIndex};
pub use registry::{Node, NodeRegistry, RegistrySnapshot, Upsert};
pub use ring::{HashRing, KeyMove, RingState};
