//! Deferred self-verification after the counter limit.
//!
//! Tokens may still be in flight when a node first hits the limit, so the
//! check runs after a grace delay rather than immediately.

use std::collections::BTreeSet;

use crate::{
    config::NodeConfig,
    error::{NodeError, Origin},
};

/// Stopping flag and outcome of the verification pass.
#[derive(Debug, Default)]
pub struct TerminationVerifier {
    stopping: bool,
    verified: bool,
}

impl TerminationVerifier {
    /// Verifier for a node still circulating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the node as stopping. Returns `true` only on the first call.
    pub fn begin(&mut self) -> bool {
        !std::mem::replace(&mut self.stopping, true)
    }

    /// Whether termination has begun.
    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Whether a verification pass succeeded.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Check the final counter sets against this node's turns.
    ///
    /// For every `t` in `1..counter_limit`, `t` must be broadcasted if this
    /// node owns it and collected otherwise. The node must also have
    /// collected more counters than it emitted.
    ///
    /// # Errors
    ///
    /// - `SoleContributor` if `|collected| <= |broadcasted|`
    /// - `MissingCounter` for the first counter not in its expected set
    /// - `OverlappingOrigins` if a counter is in both sets
    /// - `ForeignBroadcast` if a broadcasted counter is owned by another node
    pub fn verify(
        &mut self,
        config: &NodeConfig,
        collected: &BTreeSet<u64>,
        broadcasted: &BTreeSet<u64>,
    ) -> Result<(), NodeError> {
        if collected.len() <= broadcasted.len() {
            return Err(NodeError::SoleContributor {
                collected: collected.len(),
                broadcasted: broadcasted.len(),
            });
        }

        for counter in 1..config.counter_limit() {
            let (set, expected) = if config.owns(counter) {
                (broadcasted, Origin::Broadcasted)
            } else {
                (collected, Origin::Collected)
            };
            if !set.contains(&counter) {
                return Err(NodeError::MissingCounter { counter, expected });
            }
        }

        if let Some(&counter) = collected.intersection(broadcasted).next() {
            return Err(NodeError::OverlappingOrigins { counter });
        }

        if let Some(&counter) = broadcasted.iter().find(|c| !config.owns(**c)) {
            return Err(NodeError::ForeignBroadcast { counter });
        }

        self.verified = true;
        Ok(())
    }
}
