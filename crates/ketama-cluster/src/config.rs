//! Watcher configuration.

use ketama::RingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for keeping a ring in sync with a membership source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub ring: RingConfig,
    /// Delay before listing again after a failed or empty listing.
    #[serde(default = "default_resync_interval_ms")]
    pub resync_interval_ms: u64,
    /// Bake right after applying a membership change instead of leaving
    /// it to the first lookup.
    #[serde(default = "default_bake_after_sync")]
    pub bake_after_sync: bool,
    /// Capacity of the applied-event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_resync_interval_ms() -> u64 { 1000 }
fn default_bake_after_sync() -> bool { true }
fn default_event_capacity() -> usize { 256 }

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            resync_interval_ms: default_resync_interval_ms(),
            bake_after_sync: default_bake_after_sync(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ClusterConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }
}
