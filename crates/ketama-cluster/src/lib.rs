//! # Ketama Cluster
//!
//! Drives a shared [`ketama::HashRing`] from an external membership
//! registry. Discovery, session liveness and transport belong to the
//! coordination service; this crate turns what it reports into
//! [`MembershipEvent`]s and applies them to the ring.
//!
//! - [`MembershipSource`] lists live members and arms change watches.
//! - [`reconcile`] applies the minimal events that match a ring to a listing.
//! - [`MembershipWatcher`] runs list, reconcile, bake, wait in the background.
//! - [`Registration`] registers the local node and reports session loss as
//!   a [`SessionEvent`] instead of acting on it.

pub mod config;
pub mod error;
pub mod event;
pub mod liveness;
pub mod reconcile;
pub mod source;
pub mod watcher;

pub use config::ClusterConfig;
pub use error::{ClusterError, ClusterResult};
pub use event::MembershipEvent;
pub use liveness::{Registration, SessionEvent};
pub use reconcile::reconcile;
pub use source::{MembershipSource, MembershipWatch, SessionRegistry, StaticMembership};
pub use watcher::{MembershipWatcher, WatcherHandle};
