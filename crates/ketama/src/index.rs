//! The sorted virtual point index ("the ring") and its rebuild.
//!
//! An index is immutable once built. Rebuilding means building a new one
//! from a [`RegistrySnapshot`] and swapping it in; readers holding the old
//! index keep a consistent view until they drop it.

use crate::error::{Result, RingError};
use crate::hash::PointHasher;
use crate::registry::RegistrySnapshot;
use std::cmp::Ordering;
use std::sync::Arc;

/// One position on the ring and the node that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPoint {
    /// Position on the 32-bit ring.
    pub hash: u32,
    /// Name of the owning node, shared by all of its points.
    pub node: Arc<str>,
}

impl Ord for VirtualPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for VirtualPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Virtual points sorted ascending by hash, ties broken by node name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualPointIndex {
    /// Sorted points of every node.
    points: Vec<VirtualPoint>,
    /// Registry generation the points were built from.
    generation: u64,
}

impl VirtualPointIndex {
    /// Index of an empty registry at generation 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Generate, collect and sort the virtual points of every node in
    /// `snapshot`. Node `n` contributes `points_per_weight * weight(n)`
    /// points.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Registry contents to place
    /// * `points_per_weight` - Virtual points per unit of weight
    /// * `hasher` - Placement function shared with lookups
    pub fn build(
        snapshot: &RegistrySnapshot,
        points_per_weight: u32,
        hasher: &dyn PointHasher,
    ) -> Result<Self> {
        let total_weight = snapshot.total_weight();
        let too_many = || RingError::TooManyPoints {
            points_per_weight,
            total_weight,
        };
        let total = u64::from(points_per_weight)
            .checked_mul(total_weight)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(too_many)?;

        let mut points = Vec::new();
        points.try_reserve_exact(total).map_err(|_| too_many())?;

        for (name, weight) in snapshot.iter() {
            let node: Arc<str> = Arc::from(name);
            let count = points_per_weight as usize * weight as usize;
            points.extend(
                hasher
                    .point_hashes(name, count)
                    .into_iter()
                    .map(|hash| VirtualPoint {
                        hash,
                        node: Arc::clone(&node),
                    }),
            );
        }

        points.sort_unstable();

        Ok(Self {
            points,
            generation: snapshot.generation(),
        })
    }

    /// Registry generation this index was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points in ring order.
    pub fn points(&self) -> &[VirtualPoint] {
        &self.points
    }

    /// Position of the first point with `point.hash >= hash`, wrapping to 0
    /// past the last point. `None` only for an empty index.
    fn successor_position(&self, hash: u32) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let pos = self.points.partition_point(|p| p.hash < hash);
        Some(if pos == self.points.len() { 0 } else { pos })
    }

    /// The clockwise successor of `hash`: the point owning that arc.
    pub fn successor(&self, hash: u32) -> Option<&VirtualPoint> {
        self.successor_position(hash).map(|pos| &self.points[pos])
    }

    /// Walk clockwise from `hash`, collecting up to `count` distinct nodes.
    /// The first entry is always the successor's node.
    pub fn owners(&self, hash: u32, count: usize) -> Vec<Arc<str>> {
        let mut owners: Vec<Arc<str>> = Vec::with_capacity(count);
        let Some(start) = self.successor_position(hash) else {
            return owners;
        };

        let (before, after) = self.points.split_at(start);
        for point in after.iter().chain(before) {
            if owners.len() == count {
                break;
            }
            if !owners.iter().any(|o| *o == point.node) {
                owners.push(Arc::clone(&point.node));
            }
        }

        owners
    }

    /// Number of points owned by `node`.
    pub fn point_count_for(&self, node: &str) -> usize {
        self.points.iter().filter(|p| &*p.node == node).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Md5Hasher;
    use crate::registry::NodeRegistry;

    /// Places node `n`'s points at fixed positions so arcs are predictable.
    #[derive(Debug)]
    struct FixedHasher;

    impl PointHasher for FixedHasher {
        fn point_hashes(&self, name: &str, count: usize) -> Vec<u32> {
            let base: u32 = match name {
                "a" => 100,
                "b" => 200,
                "c" => 300,
                _ => 0,
            };
            (0..count as u32).map(|i| base + i * 1000).collect()
        }

        fn key_hash(&self, key: &[u8]) -> u32 {
            std::str::from_utf8(key).unwrap().parse().unwrap()
        }
    }

    fn snapshot(nodes: &[(&str, u32)]) -> RegistrySnapshot {
        let mut registry = NodeRegistry::new();
        for (name, weight) in nodes {
            registry.add(name, *weight).unwrap();
        }
        registry.snapshot()
    }

    #[test]
    fn test_build_sorted_and_sized() {
        let index =
            VirtualPointIndex::build(&snapshot(&[("a", 1), ("b", 3)]), 10, &Md5Hasher).unwrap();
        assert_eq!(index.len(), 40);
        assert_eq!(index.point_count_for("a"), 10);
        assert_eq!(index.point_count_for("b"), 30);
        assert!(index.points().windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(index.generation(), 2);
    }

    #[test]
    fn test_successor_and_wraparound() {
        let index =
            VirtualPointIndex::build(&snapshot(&[("a", 1), ("b", 1)]), 1, &FixedHasher).unwrap();
        // Points: a@100, b@200.
        assert_eq!(&*index.successor(0).unwrap().node, "a");
        assert_eq!(&*index.successor(100).unwrap().node, "a");
        assert_eq!(&*index.successor(101).unwrap().node, "b");
        assert_eq!(&*index.successor(200).unwrap().node, "b");
        assert_eq!(&*index.successor(201).unwrap().node, "a", "must wrap");
        assert_eq!(&*index.successor(u32::MAX).unwrap().node, "a");
    }

    #[test]
    fn test_tie_broken_by_name() {
        #[derive(Debug)]
        struct Collide;
        impl PointHasher for Collide {
            fn point_hashes(&self, _name: &str, count: usize) -> Vec<u32> {
                vec![42; count]
            }
            fn key_hash(&self, _key: &[u8]) -> u32 {
                42
            }
        }

        let index =
            VirtualPointIndex::build(&snapshot(&[("zeta", 1), ("alpha", 1)]), 1, &Collide)
                .unwrap();
        let names: Vec<&str> = index.points().iter().map(|p| &*p.node).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(&*index.successor(42).unwrap().node, "alpha");
    }

    #[test]
    fn test_owners_distinct_clockwise() {
        let index = VirtualPointIndex::build(
            &snapshot(&[("a", 1), ("b", 1), ("c", 1)]),
            2,
            &FixedHasher,
        )
        .unwrap();
        // Points: a@100 b@200 c@300 a@1100 b@1200 c@1300.
        let owners = index.owners(250, 3);
        let names: Vec<&str> = owners.iter().map(|o| &**o).collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        let owners = index.owners(250, 10);
        assert_eq!(owners.len(), 3, "cannot return more nodes than exist");
    }

    #[test]
    fn test_empty_index() {
        let index = VirtualPointIndex::empty();
        assert!(index.successor(7).is_none());
        assert!(index.owners(7, 2).is_empty());
    }

    #[test]
    fn test_overflow_rejected() {
        let snap = snapshot(&[("a", u32::MAX), ("b", u32::MAX)]);
        let err = VirtualPointIndex::build(&snap, u32::MAX, &Md5Hasher).unwrap_err();
        assert!(matches!(err, RingError::TooManyPoints { .. }));
    }
}
