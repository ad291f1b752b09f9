//! Inbound per-client admission control at the service boundary.
//!
//! Fixed-window counters partitioned by client identity (typically the
//! source address), independent of the outbound limiter guarding provider
//! calls. Over-limit requests are either rejected immediately with a
//! retry-after hint, or (when the caller opts into queueing and there is
//! room) parked until the window rolls over. Queued requests are served
//! oldest-first: waiters sit in a [`tokio::sync::Semaphore`] queue, which is
//! FIFO, and keep their position across window rollovers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::debug;

use crate::cancel::CancelToken;

/// Per-partition admission bounds.
#[derive(Clone, Copy, Debug)]
pub struct InboundLimiterConfig {
    /// Requests admitted per partition per window.
    pub permit_limit: u32,
    pub window: Duration,
    /// Requests allowed to wait for the next window instead of being
    /// rejected. `0` disables queueing.
    pub queue_limit: u32,
}

impl Default for InboundLimiterConfig {
    fn default() -> Self {
        Self {
            permit_limit: 100,
            window: Duration::from_secs(60),
            queue_limit: 10,
        }
    }
}

/// Why an inbound request was not admitted.
#[derive(Debug, Error)]
pub enum InboundRejection {
    /// Over the window limit (and, for the queueing path, over the queue
    /// bound). `retry_after` is the window length.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    Limited { retry_after: Duration },

    /// Cancelled while waiting in the queue.
    #[error("operation cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct Bucket {
    permits: Semaphore,
    window_start: Mutex<Instant>,
    waiting: AtomicU32,
}

/// Fixed-window rate limiter keyed by client identity.
///
/// Buckets are created on first sight of a key and kept for the process
/// lifetime; each bucket's permits replenish at window rollover, driven
/// lazily by whichever caller observes the elapsed window.
#[derive(Debug)]
pub struct InboundRateLimiter {
    config: InboundLimiterConfig,
    buckets: Mutex<FxHashMap<String, Arc<Bucket>>>,
}

impl InboundRateLimiter {
    pub fn new(config: InboundLimiterConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(FxHashMap::default()),
        }
    }

    /// Non-queueing admission check.
    pub fn try_acquire(&self, key: &str) -> Result<(), InboundRejection> {
        let bucket = self.bucket(key);
        self.roll_window(&bucket);
        match bucket.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Ok(())
            }
            Err(_) => {
                debug!(key, "inbound request rejected");
                Err(InboundRejection::Limited {
                    retry_after: self.config.window,
                })
            }
        }
    }

    /// Admission with queueing: up to `queue_limit` callers wait for the
    /// next window, oldest-first; beyond that the rejection is immediate.
    pub async fn acquire(&self, key: &str, cancel: &CancelToken) -> Result<(), InboundRejection> {
        let bucket = self.bucket(key);
        self.roll_window(&bucket);
        if let Ok(permit) = bucket.permits.try_acquire() {
            permit.forget();
            return Ok(());
        }

        let joined = bucket
            .waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |waiting| {
                (waiting < self.config.queue_limit).then_some(waiting + 1)
            });
        if joined.is_err() {
            debug!(key, "inbound queue full, rejecting");
            return Err(InboundRejection::Limited {
                retry_after: self.config.window,
            });
        }
        let _slot = QueueSlot(&bucket.waiting);

        // One pinned acquire keeps this waiter's FIFO position across
        // rollovers; the sleep arm only drives window replenishment.
        let acquire = bucket.permits.acquire();
        tokio::pin!(acquire);
        loop {
            let deadline = *bucket.window_start.lock() + self.config.window;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InboundRejection::Cancelled),
                permit = &mut acquire => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                    return Ok(());
                }
                _ = tokio::time::sleep_until(deadline) => self.roll_window(&bucket),
            }
        }
    }

    fn bucket(&self, key: &str) -> Arc<Bucket> {
        let mut buckets = self.buckets.lock();
        buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Bucket {
                    permits: Semaphore::new(self.config.permit_limit as usize),
                    window_start: Mutex::new(Instant::now()),
                    waiting: AtomicU32::new(0),
                })
            })
            .clone()
    }

    fn roll_window(&self, bucket: &Bucket) {
        let mut start = bucket.window_start.lock();
        if start.elapsed() >= self.config.window {
            *start = Instant::now();
            let missing = (self.config.permit_limit as usize)
                .saturating_sub(bucket.permits.available_permits());
            if missing > 0 {
                bucket.permits.add_permits(missing);
            }
        }
    }
}

struct QueueSlot<'a>(&'a AtomicU32);

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(permit_limit: u32, window: Duration, queue_limit: u32) -> InboundRateLimiter {
        InboundRateLimiter::new(InboundLimiterConfig {
            permit_limit,
            window,
            queue_limit,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn partitions_are_isolated() {
        let limiter = limiter(1, Duration::from_secs(10), 0);
        limiter.try_acquire("10.0.0.1").unwrap();
        // A different client still has its own budget.
        limiter.try_acquire("10.0.0.2").unwrap();
        assert!(limiter.try_acquire("10.0.0.1").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn window_rollover_resets_the_counter() {
        let limiter = limiter(2, Duration::from_secs(10), 0);
        limiter.try_acquire("client").unwrap();
        limiter.try_acquire("client").unwrap();
        assert!(limiter.try_acquire("client").is_err());

        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.try_acquire("client").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_hints_the_window_length() {
        let limiter = limiter(1, Duration::from_secs(30), 0);
        limiter.try_acquire("client").unwrap();
        match limiter.try_acquire("client") {
            Err(InboundRejection::Limited { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
