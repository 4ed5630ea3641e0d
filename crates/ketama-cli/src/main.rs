//! Ketama CLI - inspect consistent hashing placement.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "ketama")]
#[command(author, version, about = "Ketama - weighted consistent hashing ring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: nearest ketama.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter ketama.toml
    Init {
        /// Target directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Show which node owns each key
    Route {
        /// Keys to route
        keys: Vec<String>,

        /// Number of distinct nodes to list per key
        #[arg(short, long, default_value = "1")]
        replicas: usize,
    },

    /// Sample keys and compare per-node shares with weights
    Distribution {
        /// Number of keys to sample
        #[arg(short, long, default_value = "10000")]
        samples: usize,

        /// Key prefix; keys are "{prefix}{i}"
        #[arg(short, long, default_value = "v:")]
        prefix: String,
    },

    /// Show virtual point counts
    Points {
        /// Only this node
        #[arg(short, long)]
        node: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let load_config = || -> Result<Config> {
        let config = Config::load(cli.config.as_deref())?;
        tracing::debug!(nodes = config.nodes.len(), "loaded config");
        Ok(config)
    };

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Route { keys, replicas } => {
            commands::route::run(&load_config()?, &keys, replicas)
        }
        Commands::Distribution { samples, prefix } => {
            commands::distribution::run(&load_config()?, samples, &prefix)
        }
        Commands::Points { node } => commands::points::run(&load_config()?, node.as_deref()),
    }
}
