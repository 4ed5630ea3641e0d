//! Membership sources: where the live node set comes from.
//!
//! A source behaves like a coordination service directory whose children
//! are the live nodes. Listing can arm a one-shot watch that fires on the
//! next change; callers list again and re-arm after every notification.

use crate::error::{ClusterError, ClusterResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use ketama::Node;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Current members plus a signal for the next change.
pub struct MembershipWatch {
    pub members: Vec<Node>,
    /// Resolves once the member set has changed after `members` was read.
    pub changed: BoxFuture<'static, ()>,
}

impl std::fmt::Debug for MembershipWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipWatch")
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

/// Reports the live node set.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// List the current members once.
    ///
    /// Fails with [`ClusterError::PathNotFound`] if the directory is gone
    /// and [`ClusterError::NoMembers`] if it is empty.
    async fn members(&self) -> ClusterResult<Vec<Node>>;

    /// List the current members and arm a watch for the next change.
    async fn watch(&self) -> ClusterResult<MembershipWatch>;
}

/// Registration of this process as a member with a bounded lifetime.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Register `name` as a live member.
    async fn register(&self, name: &str, weight: u32) -> ClusterResult<()>;

    /// Whether `name` is still registered, plus a signal for the next
    /// change to the registry.
    async fn exists_watch(&self, name: &str) -> ClusterResult<(bool, BoxFuture<'static, ()>)>;
}

type Directory = Option<BTreeMap<String, u32>>;

/// In-memory membership directory.
///
/// Cloning shares the same directory. `None` in the underlying channel
/// means the directory itself was removed.
#[derive(Debug, Clone)]
pub struct StaticMembership {
    path: String,
    tx: Arc<watch::Sender<Directory>>,
}

impl StaticMembership {
    /// An empty directory at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(Some(BTreeMap::new()));
        Self {
            path: path.into(),
            tx: Arc::new(tx),
        }
    }

    /// A directory pre-populated with `nodes`.
    pub fn with_nodes(path: impl Into<String>, nodes: impl IntoIterator<Item = Node>) -> Self {
        let source = Self::new(path);
        source.tx.send_modify(|dir| {
            if let Some(dir) = dir {
                dir.extend(nodes.into_iter().map(|n| (n.name, n.weight)));
            }
        });
        source
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Add or reweight a member. Recreates the directory if it was closed.
    pub fn join(&self, name: impl Into<String>, weight: u32) {
        let name = name.into();
        debug!(path = %self.path, node = %name, weight, "member joined");
        self.tx.send_modify(|dir| {
            dir.get_or_insert_with(BTreeMap::new).insert(name, weight);
        });
    }

    /// Remove a member, as when its session expires. Returns whether it
    /// was present.
    pub fn leave(&self, name: &str) -> bool {
        let mut removed = false;
        self.tx.send_modify(|dir| {
            if let Some(dir) = dir {
                removed = dir.remove(name).is_some();
            }
        });
        if removed {
            debug!(path = %self.path, node = name, "member left");
        }
        removed
    }

    /// Remove the directory entirely.
    pub fn close(&self) {
        debug!(path = %self.path, "membership directory removed");
        self.tx.send_replace(None);
    }

    fn listing(&self, dir: &Directory) -> ClusterResult<Vec<Node>> {
        let dir = dir
            .as_ref()
            .ok_or_else(|| ClusterError::PathNotFound(self.path.clone()))?;
        if dir.is_empty() {
            return Err(ClusterError::NoMembers(self.path.clone()));
        }
        Ok(dir
            .iter()
            .map(|(name, &weight)| Node::new(name.clone(), weight))
            .collect())
    }

    /// Subscribe, read the current value and build the change signal.
    fn subscribe(&self) -> (Directory, BoxFuture<'static, ()>) {
        let mut rx = self.tx.subscribe();
        let dir = rx.borrow_and_update().clone();
        let changed = async move {
            // The sender lives as long as any clone of the source; an error
            // here means it is gone, which is also a change.
            let _ = rx.changed().await;
        }
        .boxed();
        (dir, changed)
    }
}

#[async_trait]
impl MembershipSource for StaticMembership {
    async fn members(&self) -> ClusterResult<Vec<Node>> {
        self.listing(&self.tx.borrow())
    }

    async fn watch(&self) -> ClusterResult<MembershipWatch> {
        let (dir, changed) = self.subscribe();
        let members = self.listing(&dir)?;
        Ok(MembershipWatch { members, changed })
    }
}

#[async_trait]
impl SessionRegistry for StaticMembership {
    async fn register(&self, name: &str, weight: u32) -> ClusterResult<()> {
        if self.tx.borrow().is_none() {
            return Err(ClusterError::PathNotFound(self.path.clone()));
        }
        self.join(name, weight);
        Ok(())
    }

    async fn exists_watch(&self, name: &str) -> ClusterResult<(bool, BoxFuture<'static, ()>)> {
        let (dir, changed) = self.subscribe();
        let dir = dir.ok_or_else(|| ClusterError::PathNotFound(self.path.clone()))?;
        Ok((dir.contains_key(name), changed))
    }
}
