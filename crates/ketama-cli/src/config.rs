//! Configuration management for the ketama CLI.

use anyhow::{Context, Result};
use ketama::{HashRing, NodeSpec, RingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "ketama.toml";

/// Ring description loaded from `ketama.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ring: RingConfig,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl Config {
    /// Starter config written by `ketama init`.
    pub fn sample() -> Self {
        Self {
            ring: RingConfig::default(),
            nodes: vec![
                NodeSpec {
                    name: "node1".into(),
                    weight: 1,
                },
                NodeSpec {
                    name: "node2".into(),
                    weight: 1,
                },
            ],
        }
    }

    /// Load from `path`, or from the nearest ketama.toml in the current or
    /// parent directories, or fall back to an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(find_config_file) {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Build and bake the ring this config describes.
    pub fn build_ring(&self) -> Result<HashRing> {
        let ring = HashRing::with_config(self.ring)?;
        for node in &self.nodes {
            ring.add_node(&node.name, node.weight)
                .with_context(|| format!("Invalid node entry {:?}", node.name))?;
        }
        ring.bake()?;
        Ok(ring)
    }

    pub fn total_weight(&self) -> u64 {
        self.nodes.iter().map(|n| u64::from(n.weight)).sum()
    }
}

/// Find ketama.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
