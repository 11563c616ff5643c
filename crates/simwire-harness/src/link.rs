//! Point-to-point link model: fixed propagation delay, optional jitter,
//! seeded random loss.
//!
//! The loss decision is made at enqueue time from the shared environment
//! RNG, so a simulation's packet fate is fully determined by its seed.

use std::time::Duration;

use simwire_core::Environment;
use tracing::trace;

use crate::sim_env::{SimEnv, SimInstant};

/// A lossy, delayed link between two nodes.
#[derive(Debug, Clone, Copy)]
pub struct LossyLink {
    /// Fixed propagation delay.
    pub delay: Duration,
    /// Additional uniform jitter in `[0, jitter]`.
    pub jitter: Duration,
    /// Loss probability in `[0, 1]`.
    pub loss: f64,
}

impl LossyLink {
    /// A loss-free link with fixed delay.
    #[must_use]
    pub fn reliable(delay: Duration) -> Self {
        Self { delay, jitter: Duration::ZERO, loss: 0.0 }
    }

    /// Decide the fate of a packet entering the link at `now`: its
    /// arrival instant, or `None` if the link drops it.
    #[must_use]
    pub fn deliver(&self, env: &SimEnv, now: SimInstant) -> Option<SimInstant> {
        if self.loss > 0.0 {
            let roll = env.random_u64() as f64 / u64::MAX as f64;
            if roll < self.loss {
                trace!(at = ?now.elapsed(), "link dropped packet");
                return None;
            }
        }
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            env.random_delay(Duration::ZERO, self.jitter)
        };
        Some(now + self.delay + jitter)
    }
}
