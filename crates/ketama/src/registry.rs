//! Authoritative node-to-weight mapping.
//!
//! The registry is the source of truth for ring membership. Every
//! successful mutation bumps a generation counter, which the ring compares
//! against the generation of its published index to decide staleness.

use crate::error::{Result, RingError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named node and its relative share of the keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub weight: u32,
}

impl Node {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Outcome of [`NodeRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The name was not registered before.
    Inserted,
    /// The name was registered; its weight is now the new one.
    Updated { previous: u32 },
}

/// Mutable name-to-weight registry.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, u32>,
    generation: u64,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with `weight`, or update its weight if present.
    pub fn add(&mut self, name: &str, weight: u32) -> Result<Upsert> {
        if name.is_empty() {
            return Err(RingError::InvalidNodeName);
        }
        if weight == 0 {
            return Err(RingError::InvalidWeight {
                name: name.to_string(),
                weight,
            });
        }

        let outcome = match self.nodes.insert(name.to_string(), weight) {
            Some(previous) => Upsert::Updated { previous },
            None => Upsert::Inserted,
        };
        self.generation += 1;
        Ok(outcome)
    }

    /// Unregister `name`, returning the weight it had.
    pub fn remove(&mut self, name: &str) -> Result<u32> {
        let weight = self
            .nodes
            .remove(name)
            .ok_or_else(|| RingError::NodeNotFound(name.to_string()))?;
        self.generation += 1;
        Ok(weight)
    }

    /// Immutable copy of the current membership.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            nodes: Arc::new(self.nodes.clone()),
            generation: self.generation,
        }
    }

    pub fn weight(&self, name: &str) -> Option<u32> {
        self.nodes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> u64 {
        self.nodes.values().map(|&w| u64::from(w)).sum()
    }

    /// Mutation counter; starts at 0 and only grows.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All nodes, ordered by name.
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes
            .iter()
            .map(|(name, &weight)| Node::new(name.clone(), weight))
            .collect()
    }
}

/// Point-in-time view of a registry, used as the input of a bake.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    nodes: Arc<BTreeMap<String, u32>>,
    generation: u64,
}

impl RegistrySnapshot {
    /// Iterate `(name, weight)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.nodes.iter().map(|(name, &weight)| (name.as_str(), weight))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.nodes.values().map(|&w| u64::from(w)).sum()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }
}
