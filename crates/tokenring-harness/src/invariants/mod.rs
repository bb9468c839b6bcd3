//! Invariant checking for ring simulations.
//!
//! Invariants are properties that must hold in every reachable state, not
//! only at the end of one scripted scenario. The harness extracts a
//! [`SystemSnapshot`] from a ring or a finished run and checks every
//! registered [`Invariant`] against it.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&ring.snapshot())?;
//! ```

mod checks;
mod snapshot;

pub use checks::{CompleteSequence, DisjointOrigins, OwnedTurnsOnly, SynchroNeverRecorded};
pub use snapshot::{NodeSnapshot, SystemSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against ring state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with the standard ring invariants.
    ///
    /// - [`DisjointOrigins`]: collected and broadcasted never overlap
    /// - [`OwnedTurnsOnly`]: counters are only emitted by their owner
    /// - [`SynchroNeverRecorded`]: counter 0 never enters either set
    /// - [`CompleteSequence`]: verified nodes saw every counter below the limit
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(DisjointOrigins);
        registry.add(OwnedTurnsOnly);
        registry.add(SynchroNeverRecorded);
        registry.add(CompleteSequence);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants. Returns every violation found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokenring_proto::NodeId;

    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn fresh_ring_passes_invariants() {
        let mut snapshot = SystemSnapshot::new(3, 12);
        for n in 0..3 {
            snapshot.add_node(NodeSnapshot::new(NodeId::new(n)));
        }
        assert!(InvariantRegistry::standard().check_all(&snapshot).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let snapshot = SystemSnapshot::new(3, 12).with_node(
            NodeSnapshot::new(NodeId::new(0)).with_collected([0, 1]).with_broadcasted([1]),
        );

        let violations = InvariantRegistry::standard().check_all(&snapshot).unwrap_err();
        let names: Vec<_> = violations.iter().map(|v| v.invariant).collect();
        assert_eq!(names, vec!["DisjointOrigins", "OwnedTurnsOnly", "SynchroNeverRecorded"]);
    }
}
