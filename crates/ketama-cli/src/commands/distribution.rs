//! Sample the keyspace and compare each node's share with its weight.

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;

use crate::config::Config;

pub fn run(config: &Config, samples: usize, prefix: &str) -> Result<()> {
    let ring = config.build_ring()?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for i in 0..samples {
        let node = ring.hash(&format!("{prefix}{i}"))?;
        *counts.entry(node).or_insert(0) += 1;
    }

    let total_weight = config.total_weight().max(1) as f64;
    let samples_f = samples.max(1) as f64;

    println!("{}", "Key Distribution".white().bold());
    println!("{}", "═".repeat(52).dimmed());
    println!(
        "  {:<20} {:>8} {:>10} {:>10}",
        "node", "keys", "actual", "expected"
    );
    for node in ring.nodes() {
        let count = counts.get(&node.name).copied().unwrap_or(0);
        let actual = count as f64 / samples_f;
        let expected = f64::from(node.weight) / total_weight;
        let deviation = (actual - expected).abs();
        let actual_str = format!("{:>9.2}%", actual * 100.0);
        println!(
            "  {:<20} {:>8} {} {:>9.2}%",
            node.name,
            count,
            if deviation > 0.05 {
                actual_str.yellow()
            } else {
                actual_str.green()
            },
            expected * 100.0
        );
    }
    println!();
    println!(
        "  {} keys sampled as \"{}N\" over {} points",
        samples.to_string().cyan(),
        prefix,
        ring.point_count().to_string().cyan()
    );
    Ok(())
}
