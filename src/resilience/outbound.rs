//! Outbound fixed-window limiter bounding total provider calls.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::cancel::{CancelToken, Cancelled};

/// Bound on provider calls per window, shared across all guarded providers.
#[derive(Clone, Copy, Debug)]
pub struct OutboundLimiterConfig {
    pub permit_limit: u32,
    pub window: Duration,
}

impl Default for OutboundLimiterConfig {
    fn default() -> Self {
        Self {
            permit_limit: 60,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

/// Global fixed-window counter for outbound provider traffic.
///
/// A call over the bound is delayed until the window rolls over rather than
/// rejected; provider calls are already retry-wrapped, so deferring is more
/// useful than failing. The delay is a cooperative sleep that observes
/// cancellation.
#[derive(Debug)]
pub struct OutboundLimiter {
    config: OutboundLimiterConfig,
    window: Mutex<Window>,
}

impl OutboundLimiter {
    pub fn new(config: OutboundLimiterConfig) -> Self {
        Self {
            config,
            window: Mutex::new(Window {
                start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Consume one permit, sleeping across window rollovers as needed.
    /// Fails only when cancelled while waiting.
    pub async fn acquire(&self, cancel: &CancelToken) -> Result<(), Cancelled> {
        loop {
            let wait = {
                let mut window = self.window.lock();
                let now = Instant::now();
                if now.duration_since(window.start) >= self.config.window {
                    window.start = now;
                    window.count = 0;
                }
                if window.count < self.config.permit_limit {
                    window.count += 1;
                    return Ok(());
                }
                self.config.window - now.duration_since(window.start)
            };

            debug!(delay = ?wait, "outbound window exhausted, delaying provider call");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
