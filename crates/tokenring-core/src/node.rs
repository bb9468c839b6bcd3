//! Ring node state machine.
//!
//! Composes the setup barrier, the circulation engine, the termination
//! verifier and a timer queue. Uses the action pattern: every input carries
//! the current time and the driver executes the returned actions. The node
//! itself never performs I/O or reads a clock.
//!
//! # Lifecycle
//!
//! ```text
//! ┌───────┐ quorum  ┌───────┐ synchro ┌─────────────┐ limit ┌──────────┐
//! │ Setup │────────>│ Ready │────────>│ Circulating │──────>│ Stopping │
//! └───────┘         └───────┘         └─────────────┘       └──────────┘
//!                                                                 │ grace
//!                                                                 ↓
//!                          ┌────────┐  all verified  ┌──────────┐
//!                          │ Halted │<───────────────│ Verified │
//!                          └────────┘   (watchdog)   └──────────┘
//! ```
//!
//! Any [`NodeError`] is fatal: the node halts itself and cancels its timers
//! before returning the error.

use std::{collections::BTreeSet, ops::Add, time::Duration};

use tokenring_proto::{NodeId, Token};

use crate::{
    barrier::{BarrierState, PeerInfo, SetupBarrier},
    config::{NodeConfig, NodeTimings},
    coordinator::Coordinator,
    engine::{Receipt, TokenEngine},
    error::NodeError,
    timer::{TimerKind, TimerQueue},
    verifier::TerminationVerifier,
};

/// Inputs from the transport and the driver's clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A peer completed identity exchange
    PeerReady {
        /// The peer that just became ready
        peer: PeerInfo,
        /// All ready peers, including `peer`
        ready_peers: Vec<PeerInfo>,
    },
    /// One delivery of a token; duplicates are possible
    TokenReceived(Token),
    /// A deadline returned by [`Node::next_deadline`] passed
    Tick,
}

/// Side effects for the driver to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    /// Send the token to every peer, fire-and-forget
    Broadcast(Token),
    /// Every node verified; stop this node and release its resources
    Halt,
}

/// One ring member.
///
/// Generic over the instant type `I` so tests drive it with a virtual
/// `Duration` clock and simulations with turmoil time.
#[derive(Debug)]
pub struct Node<I> {
    config: NodeConfig,
    timings: NodeTimings,
    identity: String,
    barrier: SetupBarrier,
    engine: TokenEngine,
    verifier: TerminationVerifier,
    timers: TimerQueue<I>,
    halted: bool,
}

impl<I> Node<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create a node and arm its watchdog.
    ///
    /// `identity` is the node's own endpoint identity, compared against peer
    /// identities to detect self-connections.
    pub fn new(
        config: NodeConfig,
        timings: NodeTimings,
        identity: impl Into<String>,
        now: I,
    ) -> Self {
        let mut timers = TimerQueue::new();
        timers.schedule(now + timings.watchdog_interval, TimerKind::Watchdog);

        Self {
            config,
            timings,
            identity: identity.into(),
            barrier: SetupBarrier::new(),
            engine: TokenEngine::new(config),
            verifier: TerminationVerifier::new(),
            timers,
            halted: false,
        }
    }

    /// Process one event.
    ///
    /// A halted node absorbs every event.
    ///
    /// # Errors
    ///
    /// Any protocol violation. The node is halted before the error returns.
    pub fn handle(
        &mut self,
        event: NodeEvent,
        now: I,
        coordinator: &impl Coordinator,
    ) -> Result<Vec<NodeAction>, NodeError> {
        if self.halted {
            tracing::trace!(node = %self.id(), ?event, "Halted node absorbed event");
            return Ok(Vec::new());
        }

        let result = match event {
            NodeEvent::PeerReady { peer, ready_peers } => self
                .barrier
                .on_peer_ready(&self.config, &self.identity, &peer, &ready_peers, coordinator)
                .map(|synchro| synchro.map(NodeAction::Broadcast).into_iter().collect()),
            NodeEvent::TokenReceived(token) => self.on_token(token, now),
            NodeEvent::Tick => self.on_tick(now, coordinator),
        };

        if let Err(error) = &result {
            tracing::error!(node = %self.id(), %error, "Protocol violation, halting");
            self.shutdown();
        }

        result
    }

    /// Halt without verifying and cancel every pending timer.
    pub fn shutdown(&mut self) {
        self.halted = true;
        self.timers.cancel_all();
    }

    /// Earliest time the driver must deliver [`NodeEvent::Tick`].
    pub fn next_deadline(&self) -> Option<I> {
        if self.halted { None } else { self.timers.next_deadline() }
    }

    fn on_token(&mut self, token: Token, now: I) -> Result<Vec<NodeAction>, NodeError> {
        let me = self.id();

        match self.engine.on_receive(token)? {
            Receipt::Duplicate => {
                tracing::trace!(node = %me, counter = token.counter(), "Duplicate token");
                Ok(Vec::new())
            },
            Receipt::OwnEcho => {
                tracing::trace!(node = %me, counter = token.counter(), "Own token echoed");
                Ok(Vec::new())
            },
            Receipt::Synchro => Ok(self.on_synchro(token, now)),
            Receipt::Recorded { limit_reached } => {
                tracing::debug!(
                    node = %me,
                    counter = token.counter(),
                    sender = %token.sender(),
                    "Token received"
                );

                if limit_reached {
                    self.begin_termination(now);
                    Ok(Vec::new())
                } else {
                    Ok(self.emit_next(now))
                }
            },
        }
    }

    fn on_synchro(&mut self, token: Token, now: I) -> Vec<NodeAction> {
        let me = self.id();

        if !self.engine.is_pristine() {
            tracing::trace!(node = %me, sender = %token.sender(), "Late synchro ignored");
            return Vec::new();
        }

        if self.config.is_initiator() {
            tracing::info!(node = %me, sender = %token.sender(), "Synchro received, starting");
            return self.emit_next(now);
        }

        match self.barrier.echo_synchro(&self.config) {
            Some(echo) => {
                tracing::debug!(node = %me, sender = %token.sender(), "Echoing synchro");
                vec![NodeAction::Broadcast(echo)]
            },
            None => {
                tracing::trace!(node = %me, sender = %token.sender(), "Synchro already sent");
                Vec::new()
            },
        }
    }

    fn emit_next(&mut self, now: I) -> Vec<NodeAction> {
        let Some(token) = self.engine.try_send_next(self.verifier.is_stopping()) else {
            return Vec::new();
        };

        tracing::debug!(node = %self.id(), counter = token.counter(), "Token sent");

        if token.counter() == self.config.counter_limit() {
            self.begin_termination(now);
        }

        vec![NodeAction::Broadcast(token)]
    }

    fn begin_termination(&mut self, now: I) {
        if self.verifier.begin() {
            tracing::info!(
                node = %self.id(),
                collected = self.engine.collected().len(),
                broadcasted = self.engine.broadcasted().len(),
                "Counter limit reached, verification scheduled"
            );
            self.timers.schedule(now + self.timings.verification_grace, TimerKind::Verification);
        }
    }

    fn on_tick(
        &mut self,
        now: I,
        coordinator: &impl Coordinator,
    ) -> Result<Vec<NodeAction>, NodeError> {
        let me = self.id();

        for kind in self.timers.pop_due(now) {
            match kind {
                TimerKind::Verification => {
                    self.verifier.verify(
                        &self.config,
                        self.engine.collected(),
                        self.engine.broadcasted(),
                    )?;
                    let verified = coordinator.register_verified(me);
                    tracing::info!(node = %me, verified, "Verification passed");
                },
                TimerKind::Watchdog => {
                    if coordinator.verified_count() >= self.config.num_nodes() as usize {
                        tracing::info!(node = %me, "All nodes verified, halting");
                        self.shutdown();
                        return Ok(vec![NodeAction::Halt]);
                    }
                    self.timers.schedule(now + self.timings.watchdog_interval, TimerKind::Watchdog);
                },
            }
        }

        Ok(Vec::new())
    }

    fn id(&self) -> NodeId {
        self.config.node_num()
    }

    /// Static configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Setup barrier progress.
    pub fn barrier_state(&self) -> BarrierState {
        self.barrier.state()
    }

    /// Whether this node's registration completed global setup.
    pub fn completed_setup(&self) -> bool {
        self.barrier.completed_setup()
    }

    /// Counters received from their owners.
    pub fn collected(&self) -> &BTreeSet<u64> {
        self.engine.collected()
    }

    /// Counters this node emitted.
    pub fn broadcasted(&self) -> &BTreeSet<u64> {
        self.engine.broadcasted()
    }

    /// Whether the counter limit has been reached.
    pub fn is_stopping(&self) -> bool {
        self.verifier.is_stopping()
    }

    /// Whether the verification pass succeeded.
    pub fn is_verified(&self) -> bool {
        self.verifier.is_verified()
    }

    /// Whether the node halted, normally or after a violation.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{coordinator::testing::LocalCoordinator, error::Origin};

    const T0: Duration = Duration::ZERO;

    fn node(num: u32) -> Node<Duration> {
        let config = NodeConfig::full_mesh(num, 3, 12).unwrap();
        Node::new(config, NodeTimings::default(), format!("node{num}"), T0)
    }

    fn token(counter: u64, sender: u32) -> NodeEvent {
        NodeEvent::TokenReceived(Token::new(counter, NodeId::new(sender)))
    }

    #[test]
    fn new_node_arms_watchdog() {
        let node = node(0);
        assert_eq!(node.next_deadline(), Some(Duration::from_millis(500)));
        assert_eq!(node.pending_timers(), 1);
    }

    #[test]
    fn initiator_starts_on_synchro_only_once() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(0);

        let synchro = NodeEvent::TokenReceived(Token::synchro(NodeId::new(1)));
        let actions = node.handle(synchro.clone(), T0, &coordinator).unwrap();
        assert_eq!(actions, vec![NodeAction::Broadcast(Token::new(1, NodeId::new(0)))]);

        assert!(node.handle(synchro, T0, &coordinator).unwrap().is_empty());
    }

    #[test]
    fn non_initiator_echoes_synchro_once() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(1);

        let synchro = NodeEvent::TokenReceived(Token::synchro(NodeId::new(0)));
        let actions = node.handle(synchro.clone(), T0, &coordinator).unwrap();
        assert_eq!(actions, vec![NodeAction::Broadcast(Token::synchro(NodeId::new(1)))]);

        assert!(node.handle(synchro, T0, &coordinator).unwrap().is_empty());
        assert!(node.collected().is_empty());
    }

    #[test]
    fn node_one_walks_its_turns_and_verifies() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(1);

        // Interleave the other nodes' counters in order, replying on each turn.
        let mut sent = Vec::new();
        for counter in 1..=12u64 {
            let owner = ((counter - 1) % 3) as u32;
            if owner == 1 {
                continue;
            }
            let actions = node.handle(token(counter, owner), T0, &coordinator).unwrap();
            sent.extend(actions.into_iter().filter_map(|a| match a {
                NodeAction::Broadcast(t) => Some(t.counter()),
                NodeAction::Halt => None,
            }));
        }

        assert_eq!(sent, vec![2, 5, 8, 11]);
        assert_eq!(node.broadcasted().iter().copied().collect::<Vec<_>>(), vec![2, 5, 8, 11]);
        let below_limit: Vec<u64> = node.collected().range(1..12).copied().collect();
        assert_eq!(below_limit, vec![1, 3, 4, 6, 7, 9, 10]);
        assert!(node.collected().contains(&12));
        assert!(node.is_stopping());

        // Grace period elapses: verification passes and registers.
        let grace = NodeTimings::default().verification_grace;
        node.handle(NodeEvent::Tick, grace, &coordinator).unwrap();
        assert!(node.is_verified());
        assert_eq!(coordinator.verified_count(), 1);
        assert!(!node.is_halted());
    }

    #[test]
    fn emitting_the_limit_starts_termination() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(2);

        for counter in [1, 2, 4, 5, 7, 8, 10] {
            let owner = ((counter - 1) % 3) as u32;
            node.handle(token(counter, owner), T0, &coordinator).unwrap();
        }
        let actions = node.handle(token(11, 1), T0, &coordinator).unwrap();

        assert_eq!(actions, vec![NodeAction::Broadcast(Token::new(12, NodeId::new(2)))]);
        assert!(node.is_stopping());
    }

    #[test]
    fn stray_tokens_after_stopping_do_not_emit() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(0);

        node.handle(token(12, 2), T0, &coordinator).unwrap();
        assert!(node.is_stopping());

        // Counter 3 arrives late.
        assert!(node.handle(token(3, 2), T0, &coordinator).unwrap().is_empty());
        assert!(node.broadcasted().is_empty());
    }

    #[test]
    fn watchdog_halts_once_everyone_verified() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(0);
        let interval = NodeTimings::default().watchdog_interval;

        assert!(node.handle(NodeEvent::Tick, interval, &coordinator).unwrap().is_empty());
        assert_eq!(node.next_deadline(), Some(interval * 2));

        for n in 0..3 {
            coordinator.register_verified(NodeId::new(n));
        }
        let actions = node.handle(NodeEvent::Tick, interval * 2, &coordinator).unwrap();
        assert_eq!(actions, vec![NodeAction::Halt]);
        assert!(node.is_halted());
        assert_eq!(node.pending_timers(), 0);
        assert_eq!(node.next_deadline(), None);

        assert!(node.handle(token(1, 0), interval * 3, &coordinator).unwrap().is_empty());
    }

    #[test]
    fn failed_verification_halts_node() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(1);

        node.handle(token(12, 2), T0, &coordinator).unwrap();
        let grace = NodeTimings::default().verification_grace;
        let err = node.handle(NodeEvent::Tick, grace, &coordinator).unwrap_err();

        assert_eq!(err, NodeError::MissingCounter { counter: 1, expected: Origin::Collected });
        assert!(node.is_halted());
        assert_eq!(node.pending_timers(), 0);
        assert_eq!(coordinator.verified_count(), 0);
    }

    #[test]
    fn peer_ready_reaching_full_setup_sends_synchro() {
        let coordinator = LocalCoordinator::default();
        coordinator.register_setup(NodeId::new(0));
        coordinator.register_setup(NodeId::new(1));
        let mut node = node(2);

        let ready = vec![PeerInfo::new("node0")];
        let event = NodeEvent::PeerReady { peer: ready[0].clone(), ready_peers: ready };
        assert!(node.handle(event, T0, &coordinator).unwrap().is_empty());

        let ready = vec![PeerInfo::new("node0"), PeerInfo::new("node1")];
        let event = NodeEvent::PeerReady { peer: ready[1].clone(), ready_peers: ready };
        let actions = node.handle(event, T0, &coordinator).unwrap();

        assert_eq!(actions, vec![NodeAction::Broadcast(Token::synchro(NodeId::new(2)))]);
        assert!(node.completed_setup());
        assert_eq!(node.barrier_state(), BarrierState::SynchroSent);
    }

    #[test]
    fn self_connection_is_fatal() {
        let coordinator = LocalCoordinator::default();
        let mut node = node(0);

        let ready = vec![PeerInfo::new("node0")];
        let event = NodeEvent::PeerReady { peer: ready[0].clone(), ready_peers: ready };

        assert!(matches!(
            node.handle(event, T0, &coordinator),
            Err(NodeError::SelfConnection { .. })
        ));
        assert!(node.is_halted());
    }
}
