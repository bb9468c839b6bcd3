//! Observable state snapshots for invariant checking.
//!
//! Invariants run against snapshots rather than live nodes so every check sees
//! one consistent point in time.

use std::collections::BTreeSet;

use tokenring_proto::NodeId;

/// Snapshot of every node in a ring.
#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    /// Ring size.
    pub num_nodes: u32,
    /// Highest counter emitted.
    pub counter_limit: u64,
    /// Per-node state.
    pub nodes: Vec<NodeSnapshot>,
}

impl SystemSnapshot {
    /// Snapshot with no nodes yet.
    pub fn new(num_nodes: u32, counter_limit: u64) -> Self {
        Self { num_nodes, counter_limit, nodes: Vec::new() }
    }

    /// Add a node snapshot.
    #[must_use]
    pub fn with_node(mut self, node: NodeSnapshot) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a node snapshot in place.
    pub fn add_node(&mut self, node: NodeSnapshot) {
        self.nodes.push(node);
    }

    /// Node whose turn it is to emit `counter` (counter must be positive).
    pub fn owner_of(&self, counter: u64) -> NodeId {
        NodeId::new((counter.saturating_sub(1) % u64::from(self.num_nodes.max(1))) as u32)
    }
}

/// Snapshot of one node's counter sets.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    /// Node position.
    pub node: NodeId,
    /// Counters received from their owners.
    pub collected: BTreeSet<u64>,
    /// Counters emitted by this node.
    pub broadcasted: BTreeSet<u64>,
    /// Whether the node passed its verification.
    pub verified: bool,
}

impl NodeSnapshot {
    /// Empty snapshot for `node`.
    pub fn new(node: NodeId) -> Self {
        Self { node, collected: BTreeSet::new(), broadcasted: BTreeSet::new(), verified: false }
    }

    /// Set the collected counters.
    #[must_use]
    pub fn with_collected(mut self, counters: impl IntoIterator<Item = u64>) -> Self {
        self.collected = counters.into_iter().collect();
        self
    }

    /// Set the broadcasted counters.
    #[must_use]
    pub fn with_broadcasted(mut self, counters: impl IntoIterator<Item = u64>) -> Self {
        self.broadcasted = counters.into_iter().collect();
        self
    }

    /// Mark the node as verified.
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }
}
