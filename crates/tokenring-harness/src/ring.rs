//! In-memory ring for fast deterministic testing.
//!
//! Runs every node in one thread without sockets. A seeded RNG picks which
//! in-flight delivery happens next, so any interleaving a real network could
//! produce is reachable, and the same seed always replays the same run.
//! Virtual time is a `Duration` since start.

use std::{collections::BTreeSet, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokenring_core::{Node, NodeAction, NodeEvent, PeerInfo};
use tokenring_proto::{NodeId, Token};

use crate::{
    config::SimConfig,
    coordinator::SharedCoordinator,
    error::SimError,
    invariants::SystemSnapshot,
    report::{NodeReport, SimReport},
    sim_transport::identity,
};

/// Clock advance when the RNG picks time over delivery.
const CLOCK_STEP: Duration = Duration::from_millis(10);

/// One message in flight.
#[derive(Debug, Clone, Copy)]
enum Delivery {
    PeerReady { to: usize, peer: u32 },
    Token { to: usize, token: Token },
}

/// Simulated ring of nodes sharing one coordinator.
pub struct TestRing {
    config: SimConfig,
    nodes: Vec<Node<Duration>>,
    ready: Vec<Vec<PeerInfo>>,
    coordinator: SharedCoordinator,
    rng: ChaCha20Rng,
    pending: Vec<Delivery>,
    dropped: BTreeSet<(NodeId, u64)>,
    now: Duration,
    steps: usize,
    limit_sent: Option<(NodeId, Duration)>,
    verified_at: Vec<Option<Duration>>,
    halted_at: Vec<Option<Duration>>,
}

impl TestRing {
    /// Build a ring with every peer handshake queued.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if any node's configuration is invalid.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let now = Duration::ZERO;
        let mut nodes = Vec::with_capacity(config.num_nodes as usize);
        for n in 0..config.num_nodes {
            nodes.push(Node::new(config.node_config(n)?, config.timings, identity(n), now));
        }

        let num_nodes = config.num_nodes;
        let pending = (0..num_nodes)
            .flat_map(|to| {
                (0..num_nodes)
                    .filter(move |peer| *peer != to)
                    .map(move |peer| Delivery::PeerReady { to: to as usize, peer })
            })
            .collect();

        Ok(Self {
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            ready: vec![Vec::new(); nodes.len()],
            verified_at: vec![None; nodes.len()],
            halted_at: vec![None; nodes.len()],
            limit_sent: None,
            nodes,
            coordinator: SharedCoordinator::new(),
            pending,
            dropped: BTreeSet::new(),
            now,
            steps: 0,
            config,
        })
    }

    /// Lose the first delivery of `counter` to node `to`.
    pub fn drop_delivery(&mut self, to: NodeId, counter: u64) {
        self.dropped.insert((to, counter));
    }

    /// Advance the ring by one delivery or one clock step.
    ///
    /// Returns `Ok(false)` once every node has halted.
    ///
    /// # Errors
    ///
    /// - `SimError::Node` if a node reports a protocol violation
    /// - `SimError::Stalled` if the step or time bound is exceeded, or
    ///   nothing is left to deliver or wait for
    pub fn step(&mut self) -> Result<bool, SimError> {
        if self.nodes.iter().all(Node::is_halted) {
            return Ok(false);
        }

        self.steps += 1;
        if self.steps > self.config.max_steps || self.now > self.config.simulation_duration {
            return Err(self.stalled());
        }

        if !self.pending.is_empty() && self.rng.gen_ratio(19, 20) {
            let index = self.rng.gen_range(0..self.pending.len());
            let delivery = self.pending.swap_remove(index);
            self.deliver(delivery)?;
        } else {
            self.advance_clock()?;
            self.tick_due()?;
        }

        Ok(true)
    }

    /// Step until every node halts.
    ///
    /// # Errors
    ///
    /// Same as [`TestRing::step`].
    pub fn run(&mut self) -> Result<SimReport, SimError> {
        while self.step()? {}

        tracing::info!(
            steps = self.steps,
            elapsed = ?self.now,
            verified = self.coordinator.verified_nodes().len(),
            "Ring halted"
        );

        Ok(self.report())
    }

    /// Current state of every node.
    pub fn report(&self) -> SimReport {
        SimReport {
            num_nodes: self.config.num_nodes,
            counter_limit: self.config.counter_limit,
            nodes: self.nodes.iter().map(NodeReport::from_node).collect(),
            verified: self.coordinator.verified_nodes().iter().map(|n| n.get()).collect(),
        }
    }

    /// Invariant snapshot of the current state.
    pub fn snapshot(&self) -> SystemSnapshot {
        self.report().snapshot()
    }

    /// Nodes, ordered by position.
    pub fn nodes(&self) -> &[Node<Duration>] {
        &self.nodes
    }

    /// Virtual time since start.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Shared coordinator of this ring.
    pub fn coordinator(&self) -> &SharedCoordinator {
        &self.coordinator
    }

    /// Sender of the final counter and when it was broadcast.
    pub fn limit_sent(&self) -> Option<(NodeId, Duration)> {
        self.limit_sent
    }

    /// When `node` passed verification.
    pub fn verified_at(&self, node: NodeId) -> Option<Duration> {
        self.verified_at.get(node.get() as usize).copied().flatten()
    }

    /// When `node` halted.
    pub fn halted_at(&self, node: NodeId) -> Option<Duration> {
        self.halted_at.get(node.get() as usize).copied().flatten()
    }

    fn deliver(&mut self, delivery: Delivery) -> Result<(), SimError> {
        match delivery {
            Delivery::PeerReady { to, peer } => {
                let peer = PeerInfo::new(identity(peer));
                self.ready[to].push(peer.clone());
                let ready_peers = self.ready[to].clone();
                self.handle(to, NodeEvent::PeerReady { peer, ready_peers })
            },
            Delivery::Token { to, token } => {
                let node = NodeId::new(to as u32);
                if self.dropped.remove(&(node, token.counter())) {
                    tracing::debug!(%node, counter = token.counter(), "Delivery dropped");
                    return Ok(());
                }
                self.handle(to, NodeEvent::TokenReceived(token))
            },
        }
    }

    fn handle(&mut self, index: usize, event: NodeEvent) -> Result<(), SimError> {
        let actions = self.nodes[index]
            .handle(event, self.now, &self.coordinator)
            .map_err(|source| SimError::Node { node: NodeId::new(index as u32), source })?;

        let node = &self.nodes[index];
        if node.is_verified() {
            self.verified_at[index].get_or_insert(self.now);
        }
        if node.is_halted() {
            self.halted_at[index].get_or_insert(self.now);
        }

        for action in actions {
            match action {
                NodeAction::Broadcast(token) => {
                    if token.counter() == self.config.counter_limit {
                        self.limit_sent = Some((token.sender(), self.now));
                    }
                    self.broadcast(index, token);
                },
                NodeAction::Halt => {
                    tracing::debug!(node = index, elapsed = ?self.now, "Node halted");
                },
            }
        }

        Ok(())
    }

    fn broadcast(&mut self, from: usize, token: Token) {
        for to in (0..self.nodes.len()).filter(|to| *to != from) {
            self.pending.push(Delivery::Token { to, token });
            if self.rng.gen_range(0..1000) < self.config.duplicate_per_mille {
                self.pending.push(Delivery::Token { to, token });
            }
        }
    }

    fn advance_clock(&mut self) -> Result<(), SimError> {
        if !self.pending.is_empty() {
            self.now += CLOCK_STEP;
            return Ok(());
        }

        match self.nodes.iter().filter_map(Node::next_deadline).min() {
            Some(deadline) => {
                self.now = self.now.max(deadline);
                Ok(())
            },
            None => Err(self.stalled()),
        }
    }

    fn tick_due(&mut self) -> Result<(), SimError> {
        for index in 0..self.nodes.len() {
            if self.nodes[index].next_deadline().is_some_and(|d| d <= self.now) {
                self.handle(index, NodeEvent::Tick)?;
            }
        }
        Ok(())
    }

    fn stalled(&self) -> SimError {
        SimError::Stalled { steps: self.steps, elapsed: self.now }
    }
}

#[cfg(test)]
mod tests {
    use tokenring_core::{NodeError, Origin};

    use super::*;
    use crate::invariants::InvariantRegistry;

    #[test]
    fn three_node_ring_completes() {
        let mut ring = TestRing::new(SimConfig::new(3, 12)).unwrap();
        let report = ring.run().unwrap();

        assert!(report.all_halted());
        assert_eq!(report.verified, vec![0, 1, 2]);
        assert_eq!(report.node(0).unwrap().broadcasted, vec![1, 4, 7, 10]);
        assert_eq!(report.node(1).unwrap().broadcasted, vec![2, 5, 8, 11]);
        assert_eq!(report.node(2).unwrap().broadcasted, vec![3, 6, 9, 12]);
        assert_eq!(report.nodes.iter().filter(|n| n.completed_setup).count(), 1);

        InvariantRegistry::standard().assert_all(&report.snapshot(), "after halt");
    }

    #[test]
    fn nodes_verify_within_grace_of_final_counter() {
        let slack = Duration::from_millis(200);

        for seed in 0..8 {
            let config = SimConfig::new(3, 12).with_seed(seed);
            let timings = config.timings;
            let mut ring = TestRing::new(config).unwrap();
            ring.run().unwrap();

            let (sender, sent_at) = ring.limit_sent().unwrap();
            assert_eq!(sender, NodeId::new(2));

            let earliest = sent_at + timings.verification_grace;
            let mut last_verified = earliest;
            for n in 0..3 {
                let node = NodeId::new(n);
                let verified_at = ring.verified_at(node).unwrap();
                assert!(
                    verified_at >= earliest && verified_at <= earliest + slack,
                    "seed {seed}: {node} verified at {verified_at:?}, limit sent at {sent_at:?}"
                );
                last_verified = last_verified.max(verified_at);
            }

            for n in 0..3 {
                let node = NodeId::new(n);
                let halted_at = ring.halted_at(node).unwrap();
                assert!(
                    halted_at <= last_verified + timings.watchdog_interval + CLOCK_STEP,
                    "seed {seed}: {node} halted at {halted_at:?}, all verified by {last_verified:?}"
                );
            }
        }
    }

    #[test]
    fn invariants_hold_at_every_step() {
        let registry = InvariantRegistry::standard();
        let mut ring = TestRing::new(SimConfig::new(4, 40).with_seed(7).with_duplicates(100))
            .unwrap();

        while ring.step().unwrap() {
            registry.assert_all(&ring.snapshot(), &format!("at {:?}", ring.now()));
        }
    }

    #[test]
    fn lost_token_fails_verification() {
        let mut ring = TestRing::new(SimConfig::new(3, 12)).unwrap();
        ring.drop_delivery(NodeId::new(1), 3);

        match ring.run() {
            Err(SimError::Node { node, source }) => {
                assert_eq!(node, NodeId::new(1));
                assert_eq!(
                    source,
                    NodeError::MissingCounter { counter: 3, expected: Origin::Collected }
                );
            },
            other => panic!("expected node failure, got {other:?}"),
        }
        assert!(ring.nodes()[1].is_halted());
    }

    #[test]
    fn same_seed_same_run() {
        let config = SimConfig::new(5, 50).with_seed(42).with_duplicates(200);
        let mut a = TestRing::new(config.clone()).unwrap();
        let mut b = TestRing::new(config).unwrap();

        let report_a = a.run().unwrap();
        let report_b = b.run().unwrap();
        assert_eq!(report_a, report_b);
        assert_eq!(a.now(), b.now());
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(TestRing::new(SimConfig::new(2, 10)), Err(SimError::Config(_))));
    }
}
