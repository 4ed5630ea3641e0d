//! The public hash ring: registry mutation, rebuild and lookup.

use crate::config::RingConfig;
use crate::error::{Result, RingError};
use crate::hash::{Md5Hasher, PointHasher};
use crate::index::VirtualPointIndex;
use crate::registry::{Node, NodeRegistry, Upsert};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Lifecycle state of a ring, derived from the registry and the published
/// index rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingState {
    /// No nodes are registered.
    Empty,
    /// The registry changed since the last published index.
    Dirty,
    /// The published index reflects the registry exactly.
    Baked,
}

/// A key whose owner differs between two indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMove {
    /// The sampled key.
    pub key: String,
    /// Owner before; `None` if the earlier index was empty.
    pub from: Option<String>,
    /// Owner now; `None` if the current index is empty.
    pub to: Option<String>,
}

#[derive(Debug)]
struct Inner {
    registry: NodeRegistry,
    index: Arc<VirtualPointIndex>,
}

impl Inner {
    fn state(&self) -> RingState {
        if self.registry.is_empty() {
            RingState::Empty
        } else if self.index.generation() == self.registry.generation() {
            RingState::Baked
        } else {
            RingState::Dirty
        }
    }
}

/// Weighted consistent hash ring.
///
/// Lookups clone the published [`VirtualPointIndex`] under a shared lock
/// and search it with no lock held. Mutations take the exclusive lock only
/// to update the registry or swap in a freshly built index, so a lookup in
/// flight always completes against a whole index, possibly the previous
/// one.
///
/// A lookup on a dirty ring bakes first. Callers that want to pay the
/// rebuild cost up front call [`HashRing::bake`] after mutating.
///
/// # Thread Safety
///
/// `HashRing` is `Send + Sync`; share it as `Arc<HashRing>`. Bakes are
/// serialized on their own mutex, so lookups racing on a dirty ring
/// rebuild it once and the rest reuse the published index. Lookups on a
/// baked ring only take the shared lock.
///
/// # Example
///
/// ```
/// use ketama::HashRing;
///
/// let ring = HashRing::new(100).unwrap();
/// ring.add_node("node1", 1).unwrap();
/// ring.add_node("node2", 2).unwrap();
/// ring.bake().unwrap();
///
/// let owner = ring.hash("user:42").unwrap();
/// assert!(owner == "node1" || owner == "node2");
/// ```
#[derive(Debug)]
pub struct HashRing {
    /// Virtual points per unit of node weight.
    points_per_weight: u32,
    /// Places virtual points and lookup keys.
    hasher: Arc<dyn PointHasher>,
    /// Registry and published index.
    inner: RwLock<Inner>,
    /// Held for the whole of a bake.
    bake_lock: Mutex<()>,
}

impl HashRing {
    /// Create an empty ring placing `points_per_weight` virtual points per
    /// unit of node weight.
    ///
    /// # Arguments
    ///
    /// * `points_per_weight` - Virtual points per unit of weight; must be
    ///   non-zero
    pub fn new(points_per_weight: u32) -> Result<Self> {
        Self::with_config(RingConfig::new(points_per_weight))
    }

    /// Create an empty ring from a [`RingConfig`], hashing with
    /// [`Md5Hasher`].
    pub fn with_config(config: RingConfig) -> Result<Self> {
        Self::with_hasher(config, Arc::new(Md5Hasher))
    }

    /// Create an empty ring with a custom point hasher.
    pub fn with_hasher(config: RingConfig, hasher: Arc<dyn PointHasher>) -> Result<Self> {
        if config.points_per_weight == 0 {
            return Err(RingError::InvalidPointDensity);
        }
        Ok(Self {
            points_per_weight: config.points_per_weight,
            hasher,
            inner: RwLock::new(Inner {
                registry: NodeRegistry::new(),
                index: Arc::new(VirtualPointIndex::empty()),
            }),
            bake_lock: Mutex::new(()),
        })
    }

    pub fn points_per_weight(&self) -> u32 {
        self.points_per_weight
    }

    /// Register a node, or change the weight of an existing one.
    ///
    /// # Arguments
    ///
    /// * `name` - Non-empty node name
    /// * `weight` - Relative capacity; must be at least 1
    pub fn add_node(&self, name: &str, weight: u32) -> Result<Upsert> {
        let mut inner = self.write();

        let current = u64::from(inner.registry.weight(name).unwrap_or(0));
        let total_weight = inner.registry.total_weight() - current + u64::from(weight);
        self.check_capacity(total_weight)?;

        let outcome = inner.registry.add(name, weight)?;
        debug!(
            node = name,
            weight,
            ?outcome,
            generation = inner.registry.generation(),
            "added node to ring"
        );
        Ok(outcome)
    }

    /// Unregister a node, returning its weight.
    pub fn remove_node(&self, name: &str) -> Result<u32> {
        let mut inner = self.write();
        let weight = inner.registry.remove(name)?;
        debug!(
            node = name,
            weight,
            remaining = inner.registry.len(),
            generation = inner.registry.generation(),
            "removed node from ring"
        );
        Ok(weight)
    }

    /// Rebuild the index from the current registry and publish it.
    ///
    /// Only one bake runs at a time; a caller that waited for another bake
    /// returns without rebuilding if that bake caught up with the registry.
    /// The index is built without holding the registry lock. If the
    /// registry changed meanwhile, the result is still published when it
    /// is newer than what readers see, and the ring stays dirty.
    pub fn bake(&self) -> Result<()> {
        let _baking = self.bake_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = {
            let inner = self.read();
            if inner.index.generation() == inner.registry.generation() {
                return Ok(());
            }
            inner.registry.snapshot()
        };

        let index = VirtualPointIndex::build(&snapshot, self.points_per_weight, &*self.hasher)?;

        let mut inner = self.write();
        if index.generation() > inner.index.generation() {
            debug!(
                nodes = snapshot.len(),
                points = index.len(),
                generation = index.generation(),
                "baked ring"
            );
            inner.index = Arc::new(index);
        }
        Ok(())
    }

    /// Owner of `key`: the node of the first point clockwise from the
    /// key's hash.
    pub fn hash(&self, key: &str) -> Result<String> {
        let index = self.lookup_index()?;
        let hash = self.hasher.key_hash(key.as_bytes());
        index
            .successor(hash)
            .map(|point| point.node.to_string())
            .ok_or(RingError::EmptyRing)
    }

    /// Up to `count` distinct nodes for `key`, owner first, then the next
    /// distinct nodes clockwise.
    pub fn replicas(&self, key: &str, count: usize) -> Result<Vec<String>> {
        let index = self.lookup_index()?;
        let hash = self.hasher.key_hash(key.as_bytes());
        Ok(index
            .owners(hash, count)
            .iter()
            .map(|node| node.to_string())
            .collect())
    }

    /// The current index, rebuilt first if the registry moved on. Hold on to it
    /// to compare ownership before and after a topology change with
    /// [`HashRing::diff_since`].
    pub fn snapshot_index(&self) -> Result<Arc<VirtualPointIndex>> {
        self.bake()?;
        Ok(Arc::clone(&self.read().index))
    }

    /// Keys among `keys` whose owner in `previous` differs from their
    /// owner now.
    pub fn diff_since<I, K>(&self, previous: &VirtualPointIndex, keys: I) -> Result<Vec<KeyMove>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let current = self.snapshot_index()?;
        let mut moves = Vec::new();

        for key in keys {
            let key = key.as_ref();
            let hash = self.hasher.key_hash(key.as_bytes());
            let from = previous.successor(hash).map(|p| &p.node);
            let to = current.successor(hash).map(|p| &p.node);
            if from != to {
                moves.push(KeyMove {
                    key: key.to_string(),
                    from: from.map(|n| n.to_string()),
                    to: to.map(|n| n.to_string()),
                });
            }
        }

        Ok(moves)
    }

    /// Current lifecycle state, derived on every call.
    pub fn state(&self) -> RingState {
        self.read().state()
    }

    /// Registered nodes, ordered by name.
    pub fn nodes(&self) -> Vec<Node> {
        self.read().registry.nodes()
    }

    /// Registered weight of `name`, if present.
    pub fn weight(&self, name: &str) -> Option<u32> {
        self.read().registry.weight(name)
    }

    pub fn node_count(&self) -> usize {
        self.read().registry.len()
    }

    /// Number of points in the published index, which lags the registry
    /// while the ring is dirty.
    pub fn point_count(&self) -> usize {
        self.read().index.len()
    }

    fn lookup_index(&self) -> Result<Arc<VirtualPointIndex>> {
        {
            let inner = self.read();
            match inner.state() {
                RingState::Empty => return Err(RingError::EmptyRing),
                RingState::Baked => return Ok(Arc::clone(&inner.index)),
                RingState::Dirty => {}
            }
        }

        trace!("implicit bake on lookup");
        self.bake()?;

        let inner = self.read();
        if inner.registry.is_empty() || inner.index.is_empty() {
            return Err(RingError::EmptyRing);
        }
        Ok(Arc::clone(&inner.index))
    }

    fn check_capacity(&self, total_weight: u64) -> Result<()> {
        let fits = u64::from(self.points_per_weight)
            .checked_mul(total_weight)
            .is_some_and(|n| usize::try_from(n).is_ok());
        if fits {
            Ok(())
        } else {
            Err(RingError::TooManyPoints {
                points_per_weight: self.points_per_weight,
                total_weight,
            })
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
