//! Retry schedule: exponential backoff with bounded uniform jitter.

use std::time::Duration;

use rand::RngExt;

/// Retry budget and delay shape for transient provider failures.
///
/// The reference schedule is three attempts with base delays of 1s and 2s
/// between them, each padded with up to `jitter_bound` of random jitter so
/// synchronized callers fan out instead of re-hammering a throttled provider
/// in lockstep.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Total attempts, including the first call. `1` disables retrying.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each retry after that.
    pub base_delay: Duration,
    /// Upper bound on the random jitter added to every delay.
    pub jitter_bound: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter_bound: Duration::from_millis(250),
        }
    }
}

impl RetryConfig {
    /// Delay to sleep after `attempt` (1-based) failed.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.base_delay.saturating_mul(1 << exponent);
        base + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let bound_ms = self.jitter_bound.as_millis() as u64;
        if bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=bound_ms))
    }
}
