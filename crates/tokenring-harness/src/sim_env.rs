//! Turmoil-based Environment implementation for deterministic testing.

use std::time::Duration;

use tokenring_core::Environment;

/// Simulation environment backed by Turmoil's virtual clock.
///
/// Must be used inside a Turmoil simulation; `now()` panics elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Environment reading the current simulation's clock.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_env_time_advances() {
        let mut sim = turmoil::Builder::new().build();

        sim.client("test", async {
            let env = SimEnv::new();

            let start = env.now();
            env.sleep(Duration::from_secs(5)).await;
            let end = env.now();

            assert_eq!(end - start, Duration::from_secs(5));

            Ok(())
        });

        sim.run().expect("simulation failed");
    }
}
