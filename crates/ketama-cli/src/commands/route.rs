//! Print the owner of each key.

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::Config;

pub fn run(config: &Config, keys: &[String], replicas: usize) -> Result<()> {
    if keys.is_empty() {
        bail!("No keys given. Usage: {}", "ketama route <KEY>...".cyan());
    }
    let ring = config.build_ring()?;

    for key in keys {
        if replicas > 1 {
            let owners = ring.replicas(key, replicas)?;
            println!("{} → {}", key.white().bold(), owners.join(", ").cyan());
        } else {
            println!("{} → {}", key.white().bold(), ring.hash(key)?.cyan());
        }
    }
    Ok(())
}
