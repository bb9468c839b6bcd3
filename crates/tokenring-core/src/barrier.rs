//! Setup barrier: peer readiness until quorum, then the synchro marker.
//!
//! Each node counts the peers that completed identity exchange. Once
//! `min_peers` are ready the node registers in the shared setup set. The one
//! node whose registration fills that set to `num_nodes` is the only node able
//! to observe the transition, so it broadcasts the synchro token.
//!
//! ```text
//! AwaitingPeers --(quorum)--> LocallyReady --(set full | echo)--> SynchroSent
//! ```

use std::collections::BTreeSet;

use tokenring_proto::{PROTOCOL_VERSION, Token};

use crate::{config::NodeConfig, coordinator::Coordinator, error::NodeError};

/// A peer that completed identity exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerInfo {
    /// Stable endpoint identity announced in the peer's `Hello`
    pub identity: String,
    /// Protocol version announced in the peer's `Hello`
    pub version: u8,
}

impl PeerInfo {
    /// Peer with the given identity speaking the current protocol version.
    pub fn new(identity: impl Into<String>) -> Self {
        Self { identity: identity.into(), version: PROTOCOL_VERSION }
    }

    /// Override the announced protocol version.
    #[must_use]
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }
}

/// Barrier progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BarrierState {
    /// Fewer than `min_peers` peers are ready
    AwaitingPeers,
    /// Registered in the shared setup set
    LocallyReady,
    /// This node has broadcast a synchro token
    SynchroSent,
}

/// Tracks peer readiness for one node.
#[derive(Debug)]
pub struct SetupBarrier {
    state: BarrierState,
    completed_setup: bool,
}

impl SetupBarrier {
    /// Barrier waiting for its first peer.
    pub fn new() -> Self {
        Self { state: BarrierState::AwaitingPeers, completed_setup: false }
    }

    /// Current state.
    pub fn state(&self) -> BarrierState {
        self.state
    }

    /// Whether this node's registration filled the shared setup set.
    pub fn completed_setup(&self) -> bool {
        self.completed_setup
    }

    /// Handle a peer becoming ready.
    ///
    /// `ready_peers` is the full set of peers that completed identity
    /// exchange, including `peer`. Returns the synchro token when this node
    /// completed global setup.
    ///
    /// # Errors
    ///
    /// - `UnsupportedVersion` if `peer` speaks another protocol version
    /// - `SelfConnection` if any ready peer carries `own_identity`
    /// - `DuplicatePeer` if two ready peers share an identity
    pub fn on_peer_ready(
        &mut self,
        config: &NodeConfig,
        own_identity: &str,
        peer: &PeerInfo,
        ready_peers: &[PeerInfo],
        coordinator: &impl Coordinator,
    ) -> Result<Option<Token>, NodeError> {
        if peer.version != PROTOCOL_VERSION {
            return Err(NodeError::UnsupportedVersion {
                identity: peer.identity.clone(),
                version: peer.version,
            });
        }
        if let Some(ready) =
            std::iter::once(peer).chain(ready_peers).find(|p| p.identity == own_identity)
        {
            return Err(NodeError::SelfConnection { identity: ready.identity.clone() });
        }
        if let Some(duplicate) = first_duplicate(ready_peers) {
            return Err(NodeError::DuplicatePeer { identity: duplicate.to_owned() });
        }

        let me = config.node_num();
        tracing::debug!(
            node = %me,
            peer = %peer.identity,
            ready = ready_peers.len(),
            "Peer ready"
        );

        if self.state != BarrierState::AwaitingPeers
            || ready_peers.len() < config.min_peers() as usize
        {
            return Ok(None);
        }

        self.state = BarrierState::LocallyReady;
        let registered = coordinator.register_setup(me);
        tracing::info!(node = %me, registered, "Setup complete locally");

        if registered == config.num_nodes() as usize {
            self.state = BarrierState::SynchroSent;
            self.completed_setup = true;
            tracing::info!(node = %me, "All nodes set up, sending synchro");
            return Ok(Some(Token::synchro(me)));
        }

        Ok(None)
    }

    /// Re-emit the synchro marker on behalf of a non-initiator.
    ///
    /// Returns a token at most once per node, and never after this node
    /// already sent one.
    pub fn echo_synchro(&mut self, config: &NodeConfig) -> Option<Token> {
        if self.state == BarrierState::SynchroSent {
            return None;
        }
        self.state = BarrierState::SynchroSent;
        Some(Token::synchro(config.node_num()))
    }
}

impl Default for SetupBarrier {
    fn default() -> Self {
        Self::new()
    }
}

fn first_duplicate(peers: &[PeerInfo]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    peers.iter().map(|p| p.identity.as_str()).find(|identity| !seen.insert(*identity))
}
