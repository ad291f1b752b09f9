//! Provider contracts and their two implementations.
//!
//! The core depends only on the [`EmbeddingProvider`] and
//! [`GenerationProvider`] object traits. Which implementation sits behind
//! them (the deterministic local [`stub`] or the HTTP-based [`remote`]
//! provider) is decided once, from configuration, at composition time; the
//! core never branches on the variant it holds.
//!
//! Cancellation is by future drop: the resilience layer races every provider
//! call against its cancellation token, so implementations only need to be
//! drop-safe (which `reqwest` requests are).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ProviderKind, RagConfig};
use crate::document::Document;

pub mod remote;
pub mod stub;

pub use remote::{RemoteGenerator, RemoteEmbedder};
pub use stub::{StubEmbedder, StubGenerator};

/// Failure shape shared by both provider contracts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not be reached or answered with a server fault.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider throttled the request.
    #[error("provider throttled the request: {0}")]
    RateLimited(String),

    /// The provider rejected the request as invalid.
    #[error("invalid provider input: {0}")]
    InvalidInput(String),

    /// The provider answered, but the payload was unusable.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Transient failures are worth retrying; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::RateLimited(_))
    }
}

/// Produces a fixed-dimension embedding vector for a text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Produces an answer grounded in the supplied context documents.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, query: &str, documents: &[Document])
    -> Result<String, ProviderError>;
}

/// Errors raised while assembling providers from configuration.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    #[error("remote provider selected but no API key configured")]
    MissingApiKey,
}

/// Build the provider pair selected by `config.provider`.
pub fn build_providers(
    config: &RagConfig,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn GenerationProvider>), ProviderBuildError> {
    match config.provider {
        ProviderKind::Stub => Ok((
            Arc::new(StubEmbedder::new(config.embedding_dimension)),
            Arc::new(StubGenerator::new()),
        )),
        ProviderKind::Remote => {
            if config.remote.api_key.is_empty() {
                return Err(ProviderBuildError::MissingApiKey);
            }
            Ok((
                Arc::new(RemoteEmbedder::new(config.remote.clone())),
                Arc::new(RemoteGenerator::new(config.remote.clone())),
            ))
        }
    }
}
