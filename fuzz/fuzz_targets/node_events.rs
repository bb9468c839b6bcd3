//! Fuzz target for the Node state machine
//!
//! # Strategy
//!
//! - Peer readiness: known peers, repeats, self-connections
//! - Tokens: arbitrary counters and senders, including synchro and strays
//! - Time: arbitrary clock advances followed by a tick
//!
//! # Invariants
//!
//! - Never panics
//! - `collected` and `broadcasted` stay disjoint
//! - Only owned counters are broadcast, never above the limit
//! - An error always leaves the node halted, and a halted node stays silent

#![no_main]

use std::{cell::RefCell, collections::BTreeSet, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenring_core::{Coordinator, Node, NodeAction, NodeConfig, NodeEvent, NodeTimings, PeerInfo};
use tokenring_proto::{NodeId, Token};

const NUM_NODES: u32 = 4;
const LIMIT: u64 = 24;

#[derive(Debug, Clone, Arbitrary)]
enum NodeOp {
    PeerReady { peer: u8 },
    Token { counter: u8, sender: u8 },
    Advance { millis: u16 },
}

#[derive(Default)]
struct FuzzCoordinator {
    setup: RefCell<BTreeSet<NodeId>>,
    verified: RefCell<BTreeSet<NodeId>>,
}

impl Coordinator for FuzzCoordinator {
    fn register_setup(&self, node: NodeId) -> usize {
        let mut setup = self.setup.borrow_mut();
        setup.insert(node);
        setup.len()
    }

    fn setup_count(&self) -> usize {
        self.setup.borrow().len()
    }

    fn register_verified(&self, node: NodeId) -> usize {
        let mut verified = self.verified.borrow_mut();
        verified.insert(node);
        verified.len()
    }

    fn verified_count(&self) -> usize {
        self.verified.borrow().len()
    }
}

fuzz_target!(|input: (u8, Vec<NodeOp>)| {
    let (position, ops) = input;
    let config = NodeConfig::full_mesh(u32::from(position) % NUM_NODES, NUM_NODES, LIMIT)
        .expect("fixed ring is valid");
    let me = config.node_num();

    let coordinator = FuzzCoordinator::default();
    let mut now = Duration::ZERO;
    let mut node = Node::new(config, NodeTimings::default(), format!("node{}", me.get()), now);
    let mut ready: Vec<PeerInfo> = Vec::new();

    for op in ops {
        let event = match op {
            NodeOp::PeerReady { peer } => {
                let peer = PeerInfo::new(format!("node{}", u32::from(peer) % (NUM_NODES + 1)));
                ready.push(peer.clone());
                NodeEvent::PeerReady { peer, ready_peers: ready.clone() }
            },
            NodeOp::Token { counter, sender } => NodeEvent::TokenReceived(Token::new(
                u64::from(counter),
                NodeId::new(u32::from(sender) % (NUM_NODES + 1)),
            )),
            NodeOp::Advance { millis } => {
                now += Duration::from_millis(u64::from(millis));
                NodeEvent::Tick
            },
        };

        let was_halted = node.is_halted();
        match node.handle(event, now, &coordinator) {
            Ok(actions) => {
                if was_halted {
                    assert!(actions.is_empty(), "halted node produced actions");
                }
                for action in actions {
                    if let NodeAction::Broadcast(token) = action {
                        assert_eq!(token.sender(), me);
                        assert!(token.counter() <= LIMIT);
                        assert!(token.is_synchro() || config.owns(token.counter()));
                    }
                }
            },
            Err(_) => assert!(node.is_halted(), "error left node running"),
        }

        assert!(node.collected().is_disjoint(node.broadcasted()));
    }
});
