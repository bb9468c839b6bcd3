//! # Token Ring Core
//!
//! Sans-IO state machine for a round-robin token ring used to check liveness
//! and ordering of a peer-to-peer broadcast substrate.
//!
//! N nodes pass an increasing counter around a virtual ring: node
//! `(c - 1) mod N` alone emits counter `c`. Each node
//!
//! 1. waits for `min_peers` ready peers and registers in a shared setup set
//!    ([`barrier`]),
//! 2. records tokens and emits on its own turn ([`engine`]),
//! 3. after the counter limit, waits a grace period and checks its sets
//!    against its turns ([`verifier`]),
//! 4. halts once every node has verified, polled by a watchdog timer.
//!
//! [`Node`] composes these behind the action pattern: the driver feeds
//! [`NodeEvent`]s with the current time and executes the returned
//! [`NodeAction`]s. Cross-node state lives behind the injected
//! [`Coordinator`].

pub mod barrier;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod env;
pub mod error;
pub mod node;
pub mod timer;
pub mod verifier;

pub use barrier::{BarrierState, PeerInfo, SetupBarrier};
pub use config::{NodeConfig, NodeTimings};
pub use coordinator::Coordinator;
pub use engine::{Receipt, TokenEngine};
pub use env::Environment;
pub use error::{ConfigError, NodeError, Origin};
pub use node::{Node, NodeAction, NodeEvent};
pub use timer::{TimerKind, TimerQueue};
pub use verifier::TerminationVerifier;
