//! Token circulation: turn-taking, duplicate suppression and emission.
//!
//! The engine keeps no round counter. Whose turn it is follows purely from the
//! highest counter collected so far: after `last`, node `last mod N` emits
//! `last + 1`. Any node that has seen the latest token therefore agrees on the
//! next emitter without knowing anything else about its peers.

use std::collections::BTreeSet;

use tokenring_proto::Token;

use crate::{config::NodeConfig, error::NodeError};

/// Outcome of receiving one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// Counter already collected
    Duplicate,
    /// Our own broadcast delivered back to us
    OwnEcho,
    /// Counter-0 synchro marker from a peer
    Synchro,
    /// New counter recorded in `collected`
    Recorded {
        /// Counter is at or above the limit; circulation ends here
        limit_reached: bool,
    },
}

/// Per-node counter bookkeeping.
///
/// # Invariants
///
/// - `collected` and `broadcasted` are disjoint.
/// - `broadcasted` holds only counters owned by this node.
/// - Counter 0 never enters either set.
/// - Counters are never removed.
#[derive(Debug, Clone)]
pub struct TokenEngine {
    config: NodeConfig,
    collected: BTreeSet<u64>,
    broadcasted: BTreeSet<u64>,
}

impl TokenEngine {
    /// Engine with empty sets.
    pub fn new(config: NodeConfig) -> Self {
        Self { config, collected: BTreeSet::new(), broadcasted: BTreeSet::new() }
    }

    /// Classify and record a received token.
    ///
    /// # Errors
    ///
    /// - `UnknownSender` if the sender is outside the ring
    /// - `TurnViolation` if the sender does not own the counter
    pub fn on_receive(&mut self, token: Token) -> Result<Receipt, NodeError> {
        let counter = token.counter();
        let sender = token.sender();

        if self.collected.contains(&counter) {
            return Ok(Receipt::Duplicate);
        }

        if sender == self.config.node_num() {
            return Ok(Receipt::OwnEcho);
        }

        if sender.get() >= self.config.num_nodes() {
            return Err(NodeError::UnknownSender { sender, num_nodes: self.config.num_nodes() });
        }

        if token.is_synchro() {
            return Ok(Receipt::Synchro);
        }

        let owner = self.config.owner_of(counter);
        if owner != sender {
            return Err(NodeError::TurnViolation { counter, owner, sender });
        }

        self.collected.insert(counter);
        debug_assert!(!self.broadcasted.contains(&counter));

        Ok(Receipt::Recorded { limit_reached: counter >= self.config.counter_limit() })
    }

    /// Emit the next counter if it is this node's turn.
    ///
    /// Returns `None` when another node owns the turn, the counter was
    /// already emitted, the node is stopping, or the limit would be exceeded.
    pub fn try_send_next(&mut self, stopping: bool) -> Option<Token> {
        let me = self.config.node_num();
        let last = self.last_seen();

        if last % u64::from(self.config.num_nodes()) != u64::from(me.get()) {
            return None;
        }

        let next = last + 1;
        if self.broadcasted.contains(&next) || stopping || next > self.config.counter_limit() {
            return None;
        }

        debug_assert!(self.config.owns(next));
        self.broadcasted.insert(next);
        Some(Token::new(next, me))
    }

    /// Highest collected counter, 0 before any.
    pub fn last_seen(&self) -> u64 {
        self.collected.last().copied().unwrap_or(Token::SYNCHRO)
    }

    /// Nothing collected or broadcast yet.
    pub fn is_pristine(&self) -> bool {
        self.collected.is_empty() && self.broadcasted.is_empty()
    }

    /// Counters received from their owners.
    pub fn collected(&self) -> &BTreeSet<u64> {
        &self.collected
    }

    /// Counters this node emitted.
    pub fn broadcasted(&self) -> &BTreeSet<u64> {
        &self.broadcasted
    }

    #[cfg(test)]
    pub(crate) fn force_collected(&mut self, counter: u64) {
        self.collected.insert(counter);
    }
}
