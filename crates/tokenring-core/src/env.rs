//! Environment abstraction for deterministic testing.
//!
//! Decouples node drivers from the system clock. The node state machine itself
//! takes time as an argument; only drivers hold an `Environment`.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time and sleeping.
///
/// Implementations must guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Simulations use turmoil's virtual time; the in-memory ring uses a
    /// `Duration` since start.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Add<Duration, Output = Self::Instant>
        + Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration. Driver code only.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
