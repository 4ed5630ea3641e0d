//! Background task keeping a ring in sync with a membership source.

use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::event::MembershipEvent;
use crate::reconcile::reconcile;
use crate::source::MembershipSource;
use futures::FutureExt;
use ketama::{HashRing, Node};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawns the sync loop: list and watch, reconcile, bake, wait for the
/// next change, repeat.
///
/// Listing failures are retried after `resync_interval`. An empty or
/// missing directory leaves the ring as it was: a coordination outage
/// must not wipe routing.
pub struct MembershipWatcher;

impl MembershipWatcher {
    pub fn spawn(
        source: Arc<dyn MembershipSource>,
        ring: Arc<HashRing>,
        config: ClusterConfig,
    ) -> WatcherHandle {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(run(source, ring, config, event_tx.clone(), shutdown_rx));

        WatcherHandle {
            event_tx,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a running watcher. Dropping it stops the watcher at its next
/// wait point.
#[derive(Debug)]
pub struct WatcherHandle {
    event_tx: broadcast::Sender<MembershipEvent>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Events applied to the ring, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<MembershipEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the watcher and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "membership watcher task failed");
        }
    }
}

async fn run(
    source: Arc<dyn MembershipSource>,
    ring: Arc<HashRing>,
    config: ClusterConfig,
    event_tx: broadcast::Sender<MembershipEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    info!("membership watcher started");

    loop {
        let watch = tokio::select! {
            watch = source.watch() => watch,
            _ = shutdown_rx.recv() => break,
        };

        let changed = match watch {
            Ok(watch) => {
                sync(&ring, &watch.members, &config, &event_tx);
                watch.changed
            }
            Err(e @ (ClusterError::NoMembers(_) | ClusterError::PathNotFound(_))) => {
                warn!(error = %e, "membership listing unusable, keeping current ring");
                tokio::time::sleep(config.resync_interval()).boxed()
            }
            Err(e) => {
                warn!(error = %e, "membership listing failed, retrying");
                tokio::time::sleep(config.resync_interval()).boxed()
            }
        };

        tokio::select! {
            _ = changed => debug!("membership changed"),
            _ = shutdown_rx.recv() => break,
        }
    }

    info!("membership watcher stopped");
}

fn sync(
    ring: &HashRing,
    members: &[Node],
    config: &ClusterConfig,
    event_tx: &broadcast::Sender<MembershipEvent>,
) {
    let events = match reconcile(ring, members) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "failed to apply membership");
            return;
        }
    };

    if config.bake_after_sync && !events.is_empty() {
        if let Err(e) = ring.bake() {
            warn!(error = %e, "bake after membership change failed");
        }
    }

    for event in events {
        // No subscribers is fine.
        let _ = event_tx.send(event);
    }
}
