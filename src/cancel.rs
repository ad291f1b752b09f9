//! Cooperative cancellation for externally invoked operations.
//!
//! Every long-running entry point in this crate ([`RagService::search`],
//! index builds, provider calls) takes a [`CancelToken`] and checks it at its
//! suspension points: backoff sleeps, single-flight waits, limiter queues,
//! and network waits. Cancellation is observed promptly and surfaces as a
//! cancellation error rather than letting the operation complete or retry.
//!
//! [`RagService::search`]: crate::service::RagService::search

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

/// Result payload for an operation interrupted by its [`CancelToken`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Cloneable cancellation token.
///
/// All clones share the same underlying flag: cancelling any clone cancels
/// them all. Waiting is multi-consumer; any number of tasks can await
/// [`cancelled`](CancelToken::cancelled) concurrently.
///
/// # Examples
///
/// ```
/// use ragweave::CancelToken;
///
/// let token = CancelToken::new();
/// let clone = token.clone();
/// assert!(!clone.is_cancelled());
///
/// token.cancel();
/// assert!(clone.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation. Idempotent; wakes all pending waiters.
    pub fn cancel(&self) {
        // Every token clone holds the sender, so this cannot fail.
        let _ = self.tx.send(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Suspend until cancellation is requested.
    ///
    /// Completes immediately if the token is already cancelled. Intended for
    /// use inside `tokio::select!` alongside the work being guarded.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // All senders gone; cancellation can no longer arrive.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
