//! Error types for the token ring node.
//!
//! Every [`NodeError`] is a protocol invariant violation. None of them are
//! recoverable: the driver stops the node and fails the run. Benign redundancy
//! (duplicates, repeated synchro, own echoes) is never reported as an error.

use thiserror::Error;
use tokenring_proto::NodeId;

/// Which of a node's two counter sets a check expected a counter in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Received from the counter's owner
    Collected,
    /// Emitted by this node on its own turn
    Broadcasted,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collected => f.write_str("collected"),
            Self::Broadcasted => f.write_str("broadcasted"),
        }
    }
}

/// Fatal protocol violations detected by a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// A ready peer announced a protocol version this node does not speak
    #[error("peer {identity} speaks protocol version {version}")]
    UnsupportedVersion {
        /// The peer's identity
        identity: String,
        /// Version the peer announced
        version: u8,
    },

    /// A ready peer has this node's own identity
    #[error("self-connection: peer identity {identity} is our own")]
    SelfConnection {
        /// The offending identity
        identity: String,
    },

    /// Two ready peers share one identity
    #[error("duplicate peer: identity {identity} appears more than once")]
    DuplicatePeer {
        /// The repeated identity
        identity: String,
    },

    /// Token sender is outside the ring
    #[error("unknown sender {sender}: ring has {num_nodes} nodes")]
    UnknownSender {
        /// Claimed sender
        sender: NodeId,
        /// Ring size
        num_nodes: u32,
    },

    /// Token emitted by a node whose turn it was not
    #[error("turn violation: counter {counter} belongs to {owner}, sent by {sender}")]
    TurnViolation {
        /// Counter carried by the token
        counter: u64,
        /// Node whose turn the counter is
        owner: NodeId,
        /// Node that actually sent it
        sender: NodeId,
    },

    /// Verification found a counter missing from the set it belongs in
    #[error("missing counter {counter}: expected in {expected} set")]
    MissingCounter {
        /// Counter that was not found
        counter: u64,
        /// Set it should have been in
        expected: Origin,
    },

    /// A counter is both collected and broadcasted
    #[error("counter {counter} is both collected and broadcasted")]
    OverlappingOrigins {
        /// Offending counter
        counter: u64,
    },

    /// A broadcasted counter is not owned by this node
    #[error("broadcasted counter {counter} is not ours")]
    ForeignBroadcast {
        /// Offending counter
        counter: u64,
    },

    /// This node collected no more than it emitted
    #[error("sole contributor: collected {collected} counters, broadcasted {broadcasted}")]
    SoleContributor {
        /// Size of the collected set
        collected: usize,
        /// Size of the broadcasted set
        broadcasted: usize,
    },
}

/// Rejected node configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Ring needs at least two nodes
    #[error("ring needs at least 2 nodes, got {0}")]
    TooFewNodes(u32),

    /// Node number outside the ring
    #[error("node number {node_num} out of range for {num_nodes} nodes")]
    NodeOutOfRange {
        /// Requested node number
        node_num: u32,
        /// Ring size
        num_nodes: u32,
    },

    /// Counter limit must be positive
    #[error("counter limit must be at least 1")]
    ZeroCounterLimit,

    /// Quorum outside `1..num_nodes`
    #[error("min_peers {min_peers} out of range: need 1..{num_nodes}")]
    InvalidQuorum {
        /// Requested quorum
        min_peers: u32,
        /// Ring size
        num_nodes: u32,
    },

    /// Node 0 would own at least half of all counters and fail verification
    #[error("limit {counter_limit} on {num_nodes} nodes leaves node0 as sole contributor")]
    SoleContributorRing {
        /// Ring size
        num_nodes: u32,
        /// Counter limit
        counter_limit: u64,
    },
}
