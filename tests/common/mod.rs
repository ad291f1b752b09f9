#![allow(dead_code)]

pub mod providers;

use std::sync::Arc;

use ragweave::config::RagConfig;
use ragweave::document::MemoryCorpus;
use ragweave::providers::EmbeddingProvider;
use ragweave::resilience::{
    BreakerConfig, OutboundLimiter, OutboundLimiterConfig, ResiliencePolicy, ResilientEmbedder,
    RetryConfig,
};

pub use providers::*;

pub const ALPHA_TEXT: &str = "The quick brown fox jumps over the lazy dog.";
pub const BETA_TEXT: &str = "A slow red turtle crawls under the sleepy cat.";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn alpha_beta_corpus() -> MemoryCorpus {
    MemoryCorpus::default()
        .with_document("alpha.txt", ALPHA_TEXT)
        .with_document("beta.txt", BETA_TEXT)
}

/// Config with deterministic (jitter-free) retries and an outbound limiter
/// wide enough to never interfere.
pub fn test_config(dimension: usize) -> RagConfig {
    RagConfig::default()
        .with_embedding_dimension(dimension)
        .with_retry(RetryConfig {
            max_attempts: 3,
            base_delay: std::time::Duration::from_millis(10),
            jitter_bound: std::time::Duration::ZERO,
        })
        .with_outbound(wide_open_outbound())
}

pub fn wide_open_outbound() -> OutboundLimiterConfig {
    OutboundLimiterConfig {
        permit_limit: u32::MAX,
        window: std::time::Duration::from_secs(60),
    }
}

/// A guarded embedder wired straight to the given provider, for exercising
/// the policy chain without the rest of the service.
pub fn guarded_embedder(
    provider: Arc<dyn EmbeddingProvider>,
    breaker: BreakerConfig,
    retry: RetryConfig,
) -> ResilientEmbedder {
    let outbound = Arc::new(OutboundLimiter::new(wide_open_outbound()));
    let policy = Arc::new(ResiliencePolicy::new("embedding", breaker, retry, outbound));
    ResilientEmbedder::new(provider, policy)
}
