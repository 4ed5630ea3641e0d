//! Bringing a ring's node set in line with a member listing.

use crate::error::{ClusterError, ClusterResult};
use crate::event::MembershipEvent;
use ketama::{HashRing, Node, RingError};
use std::collections::BTreeMap;
use tracing::debug;

/// Apply the fewest events that make `ring`'s nodes equal `members`, and
/// return them in the order applied.
///
/// Joins and weight changes are applied before departures so the ring is
/// never transiently empty while members remain. Members already present
/// with the same weight produce no event and leave the ring's state alone.
/// If `members` lists a name twice, the last weight wins.
pub fn reconcile(ring: &HashRing, members: &[Node]) -> ClusterResult<Vec<MembershipEvent>> {
    let desired: BTreeMap<&str, u32> = members
        .iter()
        .map(|m| (m.name.as_str(), m.weight))
        .collect();

    let mut events: Vec<MembershipEvent> = desired
        .iter()
        .filter(|(name, weight)| ring.weight(name) != Some(**weight))
        .map(|(name, weight)| MembershipEvent::node_up(*name, *weight))
        .collect();

    events.extend(
        ring.nodes()
            .into_iter()
            .filter(|node| !desired.contains_key(node.name.as_str()))
            .map(|node| MembershipEvent::node_down(node.name)),
    );

    let mut applied = Vec::with_capacity(events.len());
    for event in events {
        match event.apply(ring) {
            Ok(()) => applied.push(event),
            // Someone else already removed it.
            Err(ClusterError::Ring(RingError::NodeNotFound(_)))
                if matches!(event, MembershipEvent::NodeDown { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    debug!(
        members = desired.len(),
        changes = applied.len(),
        "reconciled ring with membership"
    );
    Ok(applied)
}
