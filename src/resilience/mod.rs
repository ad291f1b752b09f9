//! Resilience layer guarding every outbound provider call.
//!
//! Policies compose as a decorator around the provider objects, in a fixed
//! order: outbound rate limiting → retry with jittered backoff → circuit
//! breaker admission → the actual provider call. Call sites ([the index
//! builder](crate::index::VectorIndex), [`RagService`]) hold a
//! [`ResilientEmbedder`] or [`ResilientGenerator`] and never see retry or
//! breaker logic directly.
//!
//! Failure accounting: one wrapped call, including all of its retries,
//! counts as at most one breaker failure, so a flaky provider has to fail
//! `failure_threshold` whole calls in a row before the circuit opens. While
//! open, calls are rejected immediately, consuming neither a provider
//! invocation nor any retry budget.
//!
//! [`RagService`]: crate::service::RagService

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::cancel::{CancelToken, Cancelled};
use crate::document::Document;
use crate::providers::{EmbeddingProvider, GenerationProvider, ProviderError};

mod breaker;
mod outbound;
mod retry;

pub use breaker::{Admission, BreakerConfig, CircuitBreaker, CircuitOpenRejection, CircuitStatus};
pub use outbound::{OutboundLimiter, OutboundLimiterConfig};
pub use retry::RetryConfig;

/// Outcome surface of a guarded provider call.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Transient failures persisted through the whole retry budget.
    #[error("provider call failed after {attempts} attempts: {source}")]
    TransientExhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// The circuit is open; the provider was not invoked.
    #[error("circuit breaker is open, provider call rejected")]
    CircuitOpen,

    /// A non-retryable provider error, propagated as-is.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<Cancelled> for ResilienceError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// The composed policy chain for one guarded provider.
///
/// Each guarded provider gets its own [`CircuitBreaker`]; the
/// [`OutboundLimiter`] is shared so the bound covers total provider traffic.
#[derive(Debug)]
pub struct ResiliencePolicy {
    label: &'static str,
    breaker: CircuitBreaker,
    outbound: Arc<OutboundLimiter>,
    retry: RetryConfig,
}

impl ResiliencePolicy {
    pub fn new(
        label: &'static str,
        breaker: BreakerConfig,
        retry: RetryConfig,
        outbound: Arc<OutboundLimiter>,
    ) -> Self {
        Self {
            label,
            breaker: CircuitBreaker::new(breaker),
            outbound,
            retry,
        }
    }

    /// Current breaker status, for observability.
    pub fn circuit_status(&self) -> CircuitStatus {
        self.breaker.status()
    }

    /// Run one wrapped call through the policy chain.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancelToken,
        mut call: F,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.outbound.acquire(cancel).await?;

        let admission = self
            .breaker
            .try_acquire()
            .map_err(|_| ResilienceError::CircuitOpen)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if attempt > 1 && self.breaker.status() == CircuitStatus::Open {
                // A concurrent caller tripped the circuit; stop retrying.
                return Err(ResilienceError::CircuitOpen);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.abandon(admission);
                    return Err(ResilienceError::Cancelled);
                }
                outcome = call() => outcome,
            };

            match outcome {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(
                        provider = self.label,
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "transient provider failure, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            self.abandon(admission);
                            return Err(ResilienceError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => {
                    self.breaker.record_failure();
                    return Err(if err.is_transient() {
                        ResilienceError::TransientExhausted {
                            attempts: attempt,
                            source: err,
                        }
                    } else {
                        ResilienceError::Provider(err)
                    });
                }
            }
        }
    }

    /// A cancelled call carries no verdict about provider health; if it held
    /// the half-open probe slot, free it for the next caller.
    fn abandon(&self, admission: Admission) {
        if admission == Admission::Probe {
            self.breaker.release_probe();
        }
    }
}

/// [`EmbeddingProvider`] guarded by a [`ResiliencePolicy`].
#[derive(Clone)]
pub struct ResilientEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: Arc<ResiliencePolicy>,
}

impl ResilientEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: Arc<ResiliencePolicy>) -> Self {
        Self { inner, policy }
    }

    pub fn circuit_status(&self) -> CircuitStatus {
        self.policy.circuit_status()
    }

    pub async fn embed(
        &self,
        text: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<f32>, ResilienceError> {
        self.policy
            .execute(cancel, || self.inner.embed(text))
            .await
    }
}

/// [`GenerationProvider`] guarded by a [`ResiliencePolicy`].
#[derive(Clone)]
pub struct ResilientGenerator {
    inner: Arc<dyn GenerationProvider>,
    policy: Arc<ResiliencePolicy>,
}

impl ResilientGenerator {
    pub fn new(inner: Arc<dyn GenerationProvider>, policy: Arc<ResiliencePolicy>) -> Self {
        Self { inner, policy }
    }

    pub fn circuit_status(&self) -> CircuitStatus {
        self.policy.circuit_status()
    }

    pub async fn generate(
        &self,
        query: &str,
        documents: &[Document],
        cancel: &CancelToken,
    ) -> Result<String, ResilienceError> {
        self.policy
            .execute(cancel, || self.inner.generate(query, documents))
            .await
    }
}
