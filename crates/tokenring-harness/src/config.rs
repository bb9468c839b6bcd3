//! Parameters of one simulated run.

use std::time::Duration;

use tokenring_core::{ConfigError, NodeConfig, NodeTimings};

/// Run-wide simulation settings.
///
/// Every node uses a full-mesh quorum (`min_peers = num_nodes - 1`).
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Ring size
    pub num_nodes: u32,
    /// Highest counter emitted
    pub counter_limit: u64,
    /// Seed for every random choice in the run
    pub seed: u64,
    /// Minimum network latency (turmoil only)
    pub min_latency: Duration,
    /// Maximum network latency (turmoil only)
    pub max_latency: Duration,
    /// Virtual time after which the run is abandoned
    pub simulation_duration: Duration,
    /// Chance in 1000 that a delivery is duplicated (in-memory ring only)
    pub duplicate_per_mille: u16,
    /// Step bound for the in-memory ring
    pub max_steps: usize,
    /// Node timer durations
    pub timings: NodeTimings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_nodes: 3,
            counter_limit: 1024,
            seed: 0,
            min_latency: Duration::from_millis(1),
            max_latency: Duration::from_millis(10),
            simulation_duration: Duration::from_secs(30),
            duplicate_per_mille: 0,
            max_steps: 1_000_000,
            timings: NodeTimings::default(),
        }
    }
}

impl SimConfig {
    /// Default settings for a ring of `num_nodes` with the given limit.
    pub fn new(num_nodes: u32, counter_limit: u64) -> Self {
        Self { num_nodes, counter_limit, ..Self::default() }
    }

    /// Replace the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the duplicate rate.
    #[must_use]
    pub fn with_duplicates(mut self, per_mille: u16) -> Self {
        self.duplicate_per_mille = per_mille.min(1000);
        self
    }

    /// Configuration of node `node_num`.
    pub fn node_config(&self, node_num: u32) -> Result<NodeConfig, ConfigError> {
        NodeConfig::full_mesh(node_num, self.num_nodes, self.counter_limit)
    }

    /// Check every node's configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        (0..self.num_nodes).try_for_each(|n| self.node_config(n).map(|_| ()))
    }
}
