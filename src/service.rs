//! The retrieval service consumed by the transport layer.

use std::sync::Arc;

use tracing::info;

use crate::cancel::CancelToken;
use crate::config::RagConfig;
use crate::document::{CorpusSource, Document, FsCorpus};
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::providers::{
    EmbeddingProvider, GenerationProvider, ProviderBuildError, build_providers,
};
use crate::resilience::{
    OutboundLimiter, ResiliencePolicy, ResilientEmbedder, ResilientGenerator,
};

/// Top-K used when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Answers text queries from the corpus, optionally with a generated,
/// grounded response.
///
/// Owns the lazily built [`VectorIndex`] and the resilience chain around the
/// providers: one circuit breaker per guarded provider and one outbound
/// limiter shared between them. The inbound rate limiter is a sibling
/// component at the transport boundary, not part of this service; see
/// [`InboundRateLimiter`](crate::inbound::InboundRateLimiter).
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ragweave::{CancelToken, MemoryCorpus, RagConfig, RagService};
/// use ragweave::providers::{StubEmbedder, StubGenerator};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = RagConfig::default();
///     let corpus = MemoryCorpus::default()
///         .with_document("fox.txt", "The quick brown fox jumps over the lazy dog.");
///     let service = RagService::new(
///         &config,
///         Arc::new(corpus),
///         Arc::new(StubEmbedder::new(config.embedding_dimension)),
///         Arc::new(StubGenerator::new()),
///     );
///
///     let cancel = CancelToken::new();
///     let documents = service.search("quick fox", 3, &cancel).await?;
///     let answer = service.generate_answer("quick fox", &documents, &cancel).await?;
///     println!("{answer}");
///     Ok(())
/// }
/// ```
pub struct RagService {
    index: VectorIndex,
    generator: ResilientGenerator,
}

impl RagService {
    /// Wire the service from explicit collaborators.
    pub fn new(
        config: &RagConfig,
        source: Arc<dyn CorpusSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        let outbound = Arc::new(OutboundLimiter::new(config.outbound));
        let embed_policy = Arc::new(ResiliencePolicy::new(
            "embedding",
            config.breaker,
            config.retry,
            Arc::clone(&outbound),
        ));
        let generate_policy = Arc::new(ResiliencePolicy::new(
            "generation",
            config.breaker,
            config.retry,
            outbound,
        ));

        Self {
            index: VectorIndex::new(
                source,
                ResilientEmbedder::new(embedder, embed_policy),
                config.embedding_dimension,
            ),
            generator: ResilientGenerator::new(generator, generate_policy),
        }
    }

    /// Wire the service entirely from configuration: a filesystem corpus at
    /// `config.corpus_dir` and the provider pair `config.provider` selects.
    pub fn from_config(config: &RagConfig) -> Result<Self, ProviderBuildError> {
        let (embedder, generator) = build_providers(config)?;
        Ok(Self::new(
            config,
            Arc::new(FsCorpus::new(&config.corpus_dir)),
            embedder,
            generator,
        ))
    }

    /// The index, for warm-up and observability.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the `top_k` documents most similar to a text query.
    ///
    /// A blank query is rejected before any index or provider work.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Document>, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        info!(query, top_k, "received query");

        let documents = self.index.search_text(query, top_k, cancel).await?;
        info!(query, results = documents.len(), "query answered");
        Ok(documents)
    }

    /// Retrieve the `top_k` documents most similar to a precomputed query
    /// vector.
    pub async fn search_by_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Document>, RagError> {
        self.index.search_vector(query_vector, top_k, cancel).await
    }

    /// Produce an answer grounded in the supplied documents. Invoked only
    /// when the caller asked for an augmented response.
    pub async fn generate_answer(
        &self,
        query: &str,
        documents: &[Document],
        cancel: &CancelToken,
    ) -> Result<String, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let answer = self.generator.generate(query, documents, cancel).await?;
        Ok(answer)
    }
}
