//! Per-node scheduled tasks with cancellation.
//!
//! Generic over the instant type so the same queue runs under a virtual clock
//! (`Duration` since start) or turmoil's simulated `Instant`.

use std::collections::BTreeMap;

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Run the termination verification pass
    Verification,
    /// Poll the coordinator for global completion
    Watchdog,
}

/// Deadline-ordered timer queue.
///
/// Timers sharing a deadline fire in scheduling order.
#[derive(Debug, Clone)]
pub struct TimerQueue<I> {
    entries: BTreeMap<(I, u64), TimerKind>,
    next_seq: u64,
}

impl<I: Copy + Ord> TimerQueue<I> {
    /// Empty queue.
    pub fn new() -> Self {
        Self { entries: BTreeMap::new(), next_seq: 0 }
    }

    /// Schedule `kind` to fire at `at`.
    pub fn schedule(&mut self, at: I, kind: TimerKind) {
        self.entries.insert((at, self.next_seq), kind);
        self.next_seq += 1;
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<I> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return every timer due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: I) -> Vec<TimerKind> {
        let mut due = Vec::new();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I: Copy + Ord> Default for TimerQueue<I> {
    fn default() -> Self {
        Self::new()
    }
}
