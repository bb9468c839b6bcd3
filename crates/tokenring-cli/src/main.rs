//! Token ring simulation runner.
//!
//! # Usage
//!
//! ```bash
//! # Three nodes over simulated TCP, counting to 1024
//! tokenring-sim
//!
//! # Seven nodes in memory with 5% duplicated deliveries
//! tokenring-sim --nodes 7 --counter-limit 700 --in-memory --duplicate-rate 50
//! ```

use std::time::Duration;

use clap::Parser;
use tokenring_harness::{InvariantRegistry, SimConfig, SimReport, TestRing, run_simulation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Token ring liveness simulation
#[derive(Parser, Debug)]
#[command(name = "tokenring-sim")]
#[command(about = "Circulate a counter around a simulated ring and verify every node saw it")]
#[command(version)]
struct Args {
    /// Number of nodes in the ring
    #[arg(short, long, default_value = "3")]
    nodes: u32,

    /// Highest counter to circulate
    #[arg(short, long, default_value = "1024")]
    counter_limit: u64,

    /// Seed for every random choice in the run
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Virtual time after which the run is abandoned
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Run the in-memory ring instead of the turmoil TCP mesh
    #[arg(long)]
    in_memory: bool,

    /// Duplicated deliveries per 1000 (in-memory ring only)
    #[arg(long, default_value = "0")]
    duplicate_rate: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = SimConfig::new(args.nodes, args.counter_limit)
        .with_seed(args.seed)
        .with_duplicates(args.duplicate_rate);
    config.simulation_duration = Duration::from_secs(args.timeout_secs);
    config.validate()?;

    tracing::info!(
        nodes = config.num_nodes,
        counter_limit = config.counter_limit,
        seed = config.seed,
        in_memory = args.in_memory,
        "Starting ring"
    );

    let report =
        if args.in_memory { TestRing::new(config)?.run()? } else { run_simulation(&config)? };

    summarize(&report);

    if let Err(violations) = InvariantRegistry::standard().check_all(&report.snapshot()) {
        for violation in &violations {
            tracing::error!(%violation, "Invariant violated");
        }
        return Err(format!("{} invariant violations", violations.len()).into());
    }

    tracing::info!("All nodes verified");
    Ok(())
}

fn summarize(report: &SimReport) {
    for node in &report.nodes {
        tracing::info!(
            node = node.node,
            collected = node.collected.len(),
            broadcasted = node.broadcasted.len(),
            verified = node.verified,
            completed_setup = node.completed_setup,
            "Node finished"
        );
    }
}
