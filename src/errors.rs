//! Error taxonomy exposed at the service boundary.

use thiserror::Error;

use crate::cancel::Cancelled;
use crate::providers::ProviderError;
use crate::resilience::ResilienceError;

/// Failure surface of [`RagService`](crate::service::RagService) operations.
///
/// The boundary layer maps these onto its own status codes via
/// [`is_client_error`](RagError::is_client_error) and
/// [`is_unavailable`](RagError::is_unavailable) instead of matching
/// variants.
#[derive(Debug, Error)]
pub enum RagError {
    /// The query was empty or blank; rejected before any index or provider
    /// work.
    #[error("query must not be empty")]
    EmptyQuery,

    /// A query vector did not match the index dimension.
    #[error("query vector has dimension {got}, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Transient provider failures outlasted the retry budget. Affects this
    /// request only; the shared index is untouched.
    #[error("provider unavailable after {attempts} attempts: {source}")]
    ProviderExhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// The circuit is open; the provider was not invoked.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Non-retryable provider error.
    #[error(transparent)]
    Provider(ProviderError),

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl RagError {
    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery
                | Self::DimensionMismatch { .. }
                | Self::Provider(ProviderError::InvalidInput(_))
        )
    }

    /// True when the service is temporarily degraded and worth retrying
    /// later.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ProviderExhausted { .. } | Self::CircuitOpen)
    }
}

impl From<ResilienceError> for RagError {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::TransientExhausted { attempts, source } => {
                Self::ProviderExhausted { attempts, source }
            }
            ResilienceError::CircuitOpen => Self::CircuitOpen,
            ResilienceError::Provider(source) => Self::Provider(source),
            ResilienceError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<Cancelled> for RagError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}
