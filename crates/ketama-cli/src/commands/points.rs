//! Show how many virtual points each node holds.

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::Config;

pub fn run(config: &Config, node: Option<&str>) -> Result<()> {
    let ring = config.build_ring()?;
    let index = ring.snapshot_index()?;

    let nodes: Vec<_> = ring
        .nodes()
        .into_iter()
        .filter(|n| node.map_or(true, |wanted| n.name == wanted))
        .collect();
    if nodes.is_empty() {
        match node {
            Some(name) => bail!("Node {} is not in the ring", name.cyan()),
            None => bail!("Ring has no nodes"),
        }
    }

    for n in nodes {
        println!(
            "  {:<20} weight {:>4}  points {:>7}",
            n.name,
            n.weight,
            index.point_count_for(&n.name).to_string().cyan()
        );
    }
    println!(
        "  {} points per weight unit, {} total",
        ring.points_per_weight(),
        index.len()
    );
    Ok(())
}
