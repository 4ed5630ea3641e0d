//! End-to-end tests: a membership source driving a shared ring through
//! the watcher, and local registration monitoring.

use ketama::{HashRing, Node, RingState};
use ketama_cluster::{
    ClusterConfig, MembershipEvent, MembershipSource, MembershipWatcher, Registration,
    SessionEvent, SessionRegistry, StaticMembership,
};
use std::sync::Arc;
use std::time::Duration;

/// Helper: poll `cond` until it holds or two seconds pass.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn config() -> ClusterConfig {
    ClusterConfig {
        resync_interval_ms: 10,
        ..Default::default()
    }
}

fn ring() -> Arc<HashRing> {
    Arc::new(HashRing::with_config(config().ring).unwrap())
}

#[tokio::test]
async fn test_watcher_initial_sync_bakes() {
    let source = StaticMembership::with_nodes(
        "/ketama/nodes",
        [Node::new("node1", 1), Node::new("node2", 2)],
    );
    let ring = ring();
    let handle = MembershipWatcher::spawn(Arc::new(source), ring.clone(), config());

    wait_until(|| ring.state() == RingState::Baked).await;
    assert_eq!(ring.nodes(), vec![Node::new("node1", 1), Node::new("node2", 2)]);
    assert_eq!(ring.point_count(), 300);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_watcher_follows_joins_and_leaves() {
    let source = StaticMembership::with_nodes("/ketama/nodes", [Node::new("node1", 1)]);
    let ring = ring();
    let handle = MembershipWatcher::spawn(Arc::new(source.clone()), ring.clone(), config());
    let mut events = handle.subscribe();

    wait_until(|| ring.node_count() == 1).await;

    source.join("node2", 1);
    wait_until(|| ring.weight("node2") == Some(1)).await;

    source.leave("node1");
    wait_until(|| ring.weight("node1").is_none()).await;
    assert_eq!(ring.hash("any-key").unwrap(), "node2");

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&MembershipEvent::node_down("node1")), "{seen:?}");

    handle.shutdown().await;
}

#[tokio::test]
async fn test_watcher_keeps_ring_when_directory_vanishes() {
    let source = StaticMembership::with_nodes(
        "/ketama/nodes",
        [Node::new("node1", 1), Node::new("node2", 1)],
    );
    let ring = ring();
    let handle = MembershipWatcher::spawn(Arc::new(source.clone()), ring.clone(), config());
    wait_until(|| ring.state() == RingState::Baked).await;

    source.close();
    // Give the watcher a few resync rounds against the missing directory.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ring.node_count(), 2, "outage must not wipe routing");

    // Directory comes back with a different set.
    source.join("node3", 1);
    wait_until(|| ring.nodes() == vec![Node::new("node3", 1)]).await;

    handle.shutdown().await;
}

#[tokio::test]
async fn test_watcher_shutdown() {
    let source = StaticMembership::with_nodes("/ketama/nodes", [Node::new("node1", 1)]);
    let ring = ring();
    let handle = MembershipWatcher::spawn(Arc::new(source.clone()), ring.clone(), config());
    wait_until(|| ring.node_count() == 1).await;

    handle.shutdown().await;

    source.join("node2", 1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(ring.node_count(), 1, "stopped watcher must not apply changes");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lookups_during_membership_churn() {
    let source = StaticMembership::with_nodes("/ketama/nodes", [Node::new("base", 1)]);
    let ring = ring();
    let handle = MembershipWatcher::spawn(Arc::new(source.clone()), ring.clone(), config());
    wait_until(|| ring.node_count() == 1).await;

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let ring = ring.clone();
            tokio::spawn(async move {
                for i in 0..2_000 {
                    let node = ring.hash(&format!("r{r}:{i}")).unwrap();
                    assert!(node == "base" || node.starts_with("node"), "{node}");
                    if i % 100 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    for i in 0..20 {
        source.join(format!("node{}", i % 5), 1 + i % 3);
        if i % 3 == 0 {
            source.leave(&format!("node{}", (i + 1) % 5));
        }
        tokio::task::yield_now().await;
    }

    for reader in readers {
        reader.await.unwrap();
    }

    let expected = source.members().await.unwrap();
    wait_until(|| ring.nodes() == expected).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn test_registration_reports_expiry() {
    let registry = StaticMembership::new("/ketama/nodes");
    let mut registration = Registration::register(Arc::new(registry.clone()), "self", 1)
        .await
        .unwrap();
    assert_eq!(registration.name(), "self");
    assert_eq!(
        registration.next_event().await,
        Some(SessionEvent::Registered { name: "self".into() })
    );

    // Unrelated churn does not end the session.
    registry.join("other", 1);
    registry.leave("self");

    let event = tokio::time::timeout(Duration::from_secs(2), registration.next_event())
        .await
        .unwrap();
    assert_eq!(event, Some(SessionEvent::Expired { name: "self".into() }));
    assert_eq!(registration.next_event().await, None);
}

#[tokio::test]
async fn test_registration_reports_watch_failure() {
    let registry = StaticMembership::new("/ketama/nodes");
    let mut registration = Registration::register(Arc::new(registry.clone()), "self", 1)
        .await
        .unwrap();
    registration.next_event().await;

    registry.close();
    let event = tokio::time::timeout(Duration::from_secs(2), registration.next_event())
        .await
        .unwrap();
    assert!(
        matches!(event, Some(SessionEvent::WatchFailed { ref name, .. }) if name == "self"),
        "{event:?}"
    );
}

#[tokio::test]
async fn test_register_on_missing_directory_fails() {
    let registry = StaticMembership::new("/ketama/nodes");
    registry.close();
    assert!(registry.register("self", 1).await.is_err());
    assert!(Registration::register(Arc::new(registry), "self", 1).await.is_err());
}
