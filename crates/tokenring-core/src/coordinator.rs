//! Shared completion sets observed by every node of a run.
//!
//! Nodes never talk to each other about setup or verification. Instead each
//! node adds itself to two append-only sets and reads their sizes. The sets
//! are injected so a run owns its own instance; there is no process-wide
//! state.

use tokenring_proto::NodeId;

/// Append-only membership sets shared by all nodes of one run.
///
/// Implementations must make `register_*` safe under concurrent calls from
/// independently scheduled nodes. Registering twice is a no-op.
pub trait Coordinator {
    /// Add `node` to the setup set and return the set's size afterwards.
    fn register_setup(&self, node: NodeId) -> usize;

    /// Number of nodes that completed setup.
    fn setup_count(&self) -> usize;

    /// Add `node` to the verification set and return the set's size
    /// afterwards.
    fn register_verified(&self, node: NodeId) -> usize;

    /// Number of nodes whose verification passed.
    fn verified_count(&self) -> usize;
}

impl<C: Coordinator + ?Sized> Coordinator for &C {
    fn register_setup(&self, node: NodeId) -> usize {
        (**self).register_setup(node)
    }

    fn setup_count(&self) -> usize {
        (**self).setup_count()
    }

    fn register_verified(&self, node: NodeId) -> usize {
        (**self).register_verified(node)
    }

    fn verified_count(&self) -> usize {
        (**self).verified_count()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{cell::RefCell, collections::BTreeSet};

    use super::*;

    /// Single-threaded coordinator for unit tests.
    #[derive(Debug, Default)]
    pub(crate) struct LocalCoordinator {
        setup: RefCell<BTreeSet<NodeId>>,
        verified: RefCell<BTreeSet<NodeId>>,
    }

    impl Coordinator for LocalCoordinator {
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
}
