//! Ring token payload and node identifiers.

use serde::{Deserialize, Serialize};

/// Position of a node in the ring, `0..num_nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw node number.
    #[must_use]
    pub const fn new(node_num: u32) -> Self {
        Self(node_num)
    }

    /// Raw node number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(node_num: u32) -> Self {
        Self(node_num)
    }
}

/// The circulating ring token.
///
/// Immutable once constructed. Counter 0 is reserved as the synchronization
/// marker announcing that every node finished setup; it is never recorded by
/// a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    counter: u64,
    sender: NodeId,
}

impl Token {
    /// Counter value of the synchronization marker.
    pub const SYNCHRO: u64 = 0;

    /// Create a token carrying `counter`, emitted by `sender`.
    #[must_use]
    pub const fn new(counter: u64, sender: NodeId) -> Self {
        Self { counter, sender }
    }

    /// Create the synchronization marker emitted by `sender`.
    #[must_use]
    pub const fn synchro(sender: NodeId) -> Self {
        Self::new(Self::SYNCHRO, sender)
    }

    /// Counter value.
    #[must_use]
    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Node that emitted this token.
    #[must_use]
    pub const fn sender(&self) -> NodeId {
        self.sender
    }

    /// Whether this is the counter-0 synchronization marker.
    #[must_use]
    pub const fn is_synchro(&self) -> bool {
        self.counter == Self::SYNCHRO
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({}, {})", self.counter, self.sender)
    }
}
