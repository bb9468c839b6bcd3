//! Serializable end-of-run state.

use std::{ops::Add, time::Duration};

use serde::Serialize;
use tokenring_core::Node;
use tokenring_proto::NodeId;

use crate::invariants::{NodeSnapshot, SystemSnapshot};

/// Final state of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    /// Node position
    pub node: u32,
    /// Counters received from their owners, ascending
    pub collected: Vec<u64>,
    /// Counters emitted, ascending
    pub broadcasted: Vec<u64>,
    /// Counter limit was reached
    pub stopping: bool,
    /// Verification passed
    pub verified: bool,
    /// Node halted
    pub halted: bool,
    /// This node's registration completed global setup
    pub completed_setup: bool,
}

impl NodeReport {
    /// Capture a node's current state.
    pub fn from_node<I>(node: &Node<I>) -> Self
    where
        I: Copy + Ord + Add<Duration, Output = I>,
    {
        Self {
            node: node.config().node_num().get(),
            collected: node.collected().iter().copied().collect(),
            broadcasted: node.broadcasted().iter().copied().collect(),
            stopping: node.is_stopping(),
            verified: node.is_verified(),
            halted: node.is_halted(),
            completed_setup: node.completed_setup(),
        }
    }

    fn snapshot(&self) -> NodeSnapshot {
        let snapshot = NodeSnapshot::new(NodeId::new(self.node))
            .with_collected(self.collected.iter().copied())
            .with_broadcasted(self.broadcasted.iter().copied());
        if self.verified { snapshot.verified() } else { snapshot }
    }
}

/// Final state of a whole ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimReport {
    /// Ring size
    pub num_nodes: u32,
    /// Highest counter emitted
    pub counter_limit: u64,
    /// Per-node state, ordered by position
    pub nodes: Vec<NodeReport>,
    /// Nodes registered as verified with the coordinator
    pub verified: Vec<u32>,
}

impl SimReport {
    /// Invariant snapshot of the reported state.
    pub fn snapshot(&self) -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::new(self.num_nodes, self.counter_limit);
        for node in &self.nodes {
            snapshot.add_node(node.snapshot());
        }
        snapshot
    }

    /// Whether every node halted.
    pub fn all_halted(&self) -> bool {
        self.nodes.len() == self.num_nodes as usize && self.nodes.iter().all(|n| n.halted)
    }

    /// Report of node `node_num`.
    pub fn node(&self, node_num: u32) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.node == node_num)
    }
}

#[cfg(test)]
mod tests {
    use tokenring_core::{NodeConfig, NodeTimings};

    use super::*;

    #[test]
    fn fresh_node_report() {
        let config = NodeConfig::full_mesh(1, 3, 12).unwrap();
        let node = Node::new(config, NodeTimings::default(), "node1:9000", Duration::ZERO);

        let report = NodeReport::from_node(&node);
        assert_eq!(report.node, 1);
        assert!(report.collected.is_empty());
        assert!(!report.stopping && !report.halted && !report.completed_setup);
    }

    #[test]
    fn snapshot_carries_verified_flag() {
        let report = SimReport {
            num_nodes: 3,
            counter_limit: 4,
            nodes: vec![NodeReport {
                node: 0,
                collected: vec![2, 3],
                broadcasted: vec![1, 4],
                stopping: true,
                verified: true,
                halted: true,
                completed_setup: false,
            }],
            verified: vec![0],
        };

        let snapshot = report.snapshot();
        assert!(snapshot.nodes[0].verified);
        assert!(!report.all_halted());
        assert!(report.node(0).is_some());
        assert!(report.node(1).is_none());
    }
}
