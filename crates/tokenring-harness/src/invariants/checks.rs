//! Standard ring invariants.

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// No counter is both collected and broadcasted by the same node.
pub struct DisjointOrigins;

impl Invariant for DisjointOrigins {
    fn name(&self) -> &'static str {
        "DisjointOrigins"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            if let Some(counter) = node.collected.intersection(&node.broadcasted).next() {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{}: counter {counter} collected and broadcasted", node.node),
                });
            }
        }
        Ok(())
    }
}

/// A node only broadcasts counters on its own turn.
///
/// Also rejects received counters attributed to the receiver itself: a node
/// never collects a counter it owns.
pub struct OwnedTurnsOnly;

impl Invariant for OwnedTurnsOnly {
    fn name(&self) -> &'static str {
        "OwnedTurnsOnly"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            let positive = |c: &&u64| **c > 0;

            if let Some(counter) =
                node.broadcasted.iter().filter(positive).find(|c| state.owner_of(**c) != node.node)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{} broadcast {counter}, owned by {}",
                        node.node,
                        state.owner_of(*counter)
                    ),
                });
            }

            if let Some(counter) =
                node.collected.iter().filter(positive).find(|c| state.owner_of(**c) == node.node)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{} collected its own counter {counter}", node.node),
                });
            }
        }
        Ok(())
    }
}

/// The counter-0 synchro marker is never recorded.
pub struct SynchroNeverRecorded;

impl Invariant for SynchroNeverRecorded {
    fn name(&self) -> &'static str {
        "SynchroNeverRecorded"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            if node.collected.contains(&0) || node.broadcasted.contains(&0) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{} recorded the synchro counter", node.node),
                });
            }
        }
        Ok(())
    }
}

/// Verified nodes hold every counter below the limit in the set its owner
/// implies.
///
/// Unverified nodes are skipped: deliveries may still be in flight to them
/// even after they reached the limit.
pub struct CompleteSequence;

impl Invariant for CompleteSequence {
    fn name(&self) -> &'static str {
        "CompleteSequence"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in state.nodes.iter().filter(|n| n.verified) {
            for counter in 1..state.counter_limit {
                let owned = state.owner_of(counter) == node.node;
                let present = if owned {
                    node.broadcasted.contains(&counter)
                } else {
                    node.collected.contains(&counter)
                };
                if !present {
                    let expected = if owned { "broadcasted" } else { "collected" };
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{} is missing {counter} from {expected}", node.node),
                    });
                }
            }
        }
        Ok(())
    }
}
