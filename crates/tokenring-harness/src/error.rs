//! Errors that end a simulated run.

use std::time::Duration;

use thiserror::Error;
use tokenring_core::{ConfigError, NodeError};
use tokenring_proto::{NodeId, ProtocolError};

/// Why a simulated run failed.
#[derive(Error, Debug)]
pub enum SimError {
    /// Configuration rejected before the run started
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A node detected a protocol violation
    #[error("{node} failed: {source}")]
    Node {
        /// Failing node
        node: NodeId,
        /// Violation it reported
        #[source]
        source: NodeError,
    },

    /// A peer sent an undecodable frame
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Identity exchange did not complete
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Socket failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The ring stopped making progress
    #[error("ring stalled after {steps} steps ({elapsed:?} virtual time)")]
    Stalled {
        /// Steps taken
        steps: usize,
        /// Virtual time elapsed
        elapsed: Duration,
    },

    /// Turmoil reported a failure
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// The run ended before every node halted
    #[error("{halted} of {num_nodes} nodes halted")]
    Incomplete {
        /// Nodes that halted
        halted: usize,
        /// Ring size
        num_nodes: u32,
    },
}
