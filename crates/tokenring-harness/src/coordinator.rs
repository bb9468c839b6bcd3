//! Thread-safe coordinator shared by every node of one run.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, PoisonError},
};

use tokenring_core::Coordinator;
use tokenring_proto::NodeId;

/// Completion sets of one run. Only ever grow.
#[derive(Debug, Default)]
struct GlobalTestState {
    setup: BTreeSet<NodeId>,
    verified: BTreeSet<NodeId>,
}

/// Cloneable handle to one run's completion sets.
///
/// Every clone observes the same sets. Create a fresh coordinator per run;
/// nothing is process-global.
#[derive(Debug, Clone, Default)]
pub struct SharedCoordinator {
    state: Arc<Mutex<GlobalTestState>>,
}

impl SharedCoordinator {
    /// Coordinator with empty sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes whose verification passed.
    pub fn verified_nodes(&self) -> BTreeSet<NodeId> {
        self.with_state(|state| state.verified.clone())
    }

    // Poisoning is ignored: every mutation is a single set insert.
    fn with_state<T>(&self, f: impl FnOnce(&mut GlobalTestState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl Coordinator for SharedCoordinator {
    fn register_setup(&self, node: NodeId) -> usize {
        self.with_state(|state| {
            state.setup.insert(node);
            state.setup.len()
        })
    }

    fn setup_count(&self) -> usize {
        self.with_state(|state| state.setup.len())
    }

    fn register_verified(&self, node: NodeId) -> usize {
        self.with_state(|state| {
            state.verified.insert(node);
            state.verified.len()
        })
    }

    fn verified_count(&self) -> usize {
        self.with_state(|state| state.verified.len())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn clones_share_sets() {
        let a = SharedCoordinator::new();
        let b = a.clone();

        assert_eq!(a.register_setup(NodeId::new(0)), 1);
        assert_eq!(b.register_setup(NodeId::new(1)), 2);
        assert_eq!(a.register_setup(NodeId::new(1)), 2);
        assert_eq!(b.setup_count(), 2);
        assert_eq!(a.verified_count(), 0);
    }

    #[test]
    fn concurrent_registration_counts_each_node_once() {
        let coordinator = SharedCoordinator::new();

        let handles: Vec<_> = (0..8u32)
            .map(|n| {
                let coordinator = coordinator.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        coordinator.register_verified(NodeId::new(n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(coordinator.verified_count(), 8);
        assert_eq!(coordinator.verified_nodes().len(), 8);
    }
}
