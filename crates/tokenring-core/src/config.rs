//! Static per-node parameters.

use std::time::Duration;

use tokenring_proto::NodeId;

use crate::error::ConfigError;

/// Immutable configuration of one ring node.
///
/// Validated once by [`NodeConfig::new`]; every accessor afterwards can rely
/// on `node_num < num_nodes` and a non-zero limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    node_num: NodeId,
    num_nodes: u32,
    min_peers: u32,
    counter_limit: u64,
}

impl NodeConfig {
    /// Validate and build a node configuration.
    ///
    /// # Errors
    ///
    /// - `TooFewNodes` when `num_nodes < 2`
    /// - `NodeOutOfRange` when `node_num >= num_nodes`
    /// - `ZeroCounterLimit` when `counter_limit == 0`
    /// - `InvalidQuorum` unless `1 <= min_peers < num_nodes`
    /// - `SoleContributorRing` when node 0 would own half the counters or
    ///   more, which the termination check rejects unconditionally
    pub fn new(
        node_num: u32,
        num_nodes: u32,
        min_peers: u32,
        counter_limit: u64,
    ) -> Result<Self, ConfigError> {
        if num_nodes < 2 {
            return Err(ConfigError::TooFewNodes(num_nodes));
        }
        if node_num >= num_nodes {
            return Err(ConfigError::NodeOutOfRange { node_num, num_nodes });
        }
        if counter_limit == 0 {
            return Err(ConfigError::ZeroCounterLimit);
        }
        if min_peers == 0 || min_peers >= num_nodes {
            return Err(ConfigError::InvalidQuorum { min_peers, num_nodes });
        }

        let initiator_turns = counter_limit.div_ceil(u64::from(num_nodes));
        if counter_limit <= 2 * initiator_turns {
            return Err(ConfigError::SoleContributorRing { num_nodes, counter_limit });
        }

        Ok(Self { node_num: NodeId::new(node_num), num_nodes, min_peers, counter_limit })
    }

    /// Fully connected configuration: every node waits for all other peers.
    ///
    /// # Errors
    ///
    /// Same as [`NodeConfig::new`].
    pub fn full_mesh(node_num: u32, num_nodes: u32, counter_limit: u64) -> Result<Self, ConfigError> {
        Self::new(node_num, num_nodes, num_nodes.saturating_sub(1), counter_limit)
    }

    /// This node's ring position.
    pub fn node_num(&self) -> NodeId {
        self.node_num
    }

    /// Ring size.
    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }

    /// Ready peers required before this node registers setup.
    pub fn min_peers(&self) -> u32 {
        self.min_peers
    }

    /// Highest counter that will be emitted.
    pub fn counter_limit(&self) -> u64 {
        self.counter_limit
    }

    /// Node whose turn it is to emit `counter`.
    ///
    /// Counter 0 has no owner; callers must filter the synchro marker first.
    pub fn owner_of(&self, counter: u64) -> NodeId {
        debug_assert!(counter > 0);
        NodeId::new((counter.saturating_sub(1) % u64::from(self.num_nodes)) as u32)
    }

    /// Whether this node emits `counter`.
    pub fn owns(&self, counter: u64) -> bool {
        counter > 0 && self.owner_of(counter) == self.node_num
    }

    /// Whether this node starts circulation on receiving a synchro token.
    pub fn is_initiator(&self) -> bool {
        self.node_num.get() == 0
    }
}

/// Timer durations used by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTimings {
    /// Delay between reaching the limit and verifying, leaving room for
    /// in-flight tokens to land
    pub verification_grace: Duration,
    /// Period of the halt watchdog
    pub watchdog_interval: Duration,
}

impl Default for NodeTimings {
    fn default() -> Self {
        Self {
            verification_grace: Duration::from_secs(2),
            watchdog_interval: Duration::from_millis(500),
        }
    }
}
