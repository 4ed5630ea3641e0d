//! Registration of the local node and monitoring of its session.
//!
//! When the registration disappears or its watch cannot be set, the
//! monitor reports it and stops. What to do about it (exit, re-register,
//! alert) is up to the embedding application.

use crate::error::ClusterResult;
use crate::source::SessionRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Lifecycle of the local registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The registration was created.
    Registered { name: String },
    /// The registration no longer exists.
    Expired { name: String },
    /// The registry could not be watched; the registration state is
    /// unknown.
    WatchFailed { name: String, reason: String },
}

/// A live registration of this process and the task watching it.
#[derive(Debug)]
pub struct Registration {
    name: String,
    events: mpsc::Receiver<SessionEvent>,
    task: JoinHandle<()>,
}

impl Registration {
    /// Register `name` with `weight` and start monitoring it.
    ///
    /// Fails if the registration itself cannot be created. Afterwards,
    /// every problem arrives as a [`SessionEvent`].
    pub async fn register(
        registry: Arc<dyn SessionRegistry>,
        name: impl Into<String>,
        weight: u32,
    ) -> ClusterResult<Self> {
        let name = name.into();
        registry.register(&name, weight).await?;
        info!(node = %name, weight, "registered membership");

        let (tx, events) = mpsc::channel(8);
        let _ = tx
            .send(SessionEvent::Registered { name: name.clone() })
            .await;
        let task = tokio::spawn(monitor(registry, name.clone(), tx));

        Ok(Self { name, events, task })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next session event; `None` once monitoring has stopped and all
    /// events were received.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Stop monitoring. The registration itself is left in place.
    pub fn stop(self) {
        self.task.abort();
    }
}

async fn monitor(registry: Arc<dyn SessionRegistry>, name: String, tx: mpsc::Sender<SessionEvent>) {
    loop {
        info!(node = %name, "setting registration watch");
        let changed = match registry.exists_watch(&name).await {
            Ok((true, changed)) => changed,
            Ok((false, _)) => {
                warn!(node = %name, "registration no longer exists");
                let _ = tx.send(SessionEvent::Expired { name }).await;
                return;
            }
            Err(e) => {
                warn!(node = %name, error = %e, "registration watch failed");
                let _ = tx
                    .send(SessionEvent::WatchFailed {
                        name,
                        reason: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        tokio::select! {
            _ = changed => {}
            _ = tx.closed() => return,
        }
    }
}
