//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness). The
//! engines themselves never call `now()` — time always arrives as a method
//! parameter — but they draw jitter and identifiers through this trait so a
//! seeded simulation environment reproduces runs exactly.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// Production environments use `std::time::Instant` and OS entropy; the
/// simulation harness uses a virtual clock and a seeded RNG.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within one execution context
/// - `random_bytes()` is deterministic under a fixed seed in simulation
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// A uniformly distributed delay in `[min, max]`.
    ///
    /// Used for timer jitter (e.g. the RIP triggered-update holddown).
    /// Returns `min` when the range is empty.
    fn random_delay(&self, min: Duration, max: Duration) -> Duration {
        let Some(range) = max.checked_sub(min) else {
            return min;
        };
        let range_nanos = range.as_nanos();
        if range_nanos == 0 {
            return min;
        }
        let offset = u128::from(self.random_u64()) % (range_nanos + 1);
        min + Duration::from_nanos(offset as u64)
    }
}
