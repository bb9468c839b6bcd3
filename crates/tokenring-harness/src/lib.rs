//! Deterministic simulation harness for the token ring liveness protocol.
//!
//! Two drivers run the same [`tokenring_core::Node`] state machine:
//!
//! - [`TestRing`] keeps every node in one thread and lets a seeded RNG choose
//!   the delivery order. Fast enough for property tests over thousands of
//!   interleavings, and supports fault injection.
//! - [`run_simulation`] gives each node its own turmoil host and real framed
//!   TCP connections under simulated latency.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold at every step of
//! every run. Use [`InvariantRegistry::standard()`] for the ring invariants.

#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod invariants;
pub mod report;
pub mod ring;
pub mod sim_env;
pub mod sim_node;
pub mod sim_transport;
pub mod simulation;

pub use config::SimConfig;
pub use coordinator::SharedCoordinator;
pub use error::SimError;
pub use invariants::{
    CompleteSequence, DisjointOrigins, Invariant, InvariantRegistry, InvariantResult,
    NodeSnapshot, OwnedTurnsOnly, SynchroNeverRecorded, SystemSnapshot, Violation,
};
pub use report::{NodeReport, SimReport};
pub use ring::TestRing;
pub use sim_env::SimEnv;
pub use sim_node::run_node;
pub use simulation::run_simulation;
