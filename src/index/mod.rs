//! Lazily built, concurrency-safe in-memory vector index.
//!
//! The index is computed exactly once, on first use, behind a single-flight
//! guard ([`tokio::sync::OnceCell`]): the first caller runs the build while
//! every concurrent caller suspends until the same finished index is
//! observable. Once built, the entries are immutable for the process
//! lifetime and reads take no lock.
//!
//! The build is best-effort, never fatal: an absent corpus yields an empty
//! index, a document that fails to embed is logged and skipped, and a
//! circuit-breaker trip truncates the remaining batch for the pass, leaving
//! a smaller index rather than a broken one.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::document::{CorpusSource, Document};
use crate::errors::RagError;
use crate::resilience::{ResilienceError, ResilientEmbedder};

mod ranker;

pub(crate) use ranker::l2_norm;

/// One indexed document with its embedding and precomputed norm.
#[derive(Clone, Debug)]
pub struct IndexEntry {
    pub document: Document,
    pub vector: Vec<f32>,
    pub norm: f32,
}

/// In-memory cosine-similarity index over the corpus.
pub struct VectorIndex {
    source: Arc<dyn CorpusSource>,
    embedder: ResilientEmbedder,
    dimension: usize,
    entries: OnceCell<Vec<IndexEntry>>,
}

impl VectorIndex {
    pub fn new(
        source: Arc<dyn CorpusSource>,
        embedder: ResilientEmbedder,
        dimension: usize,
    ) -> Self {
        Self {
            source,
            embedder,
            dimension,
            entries: OnceCell::new(),
        }
    }

    /// Fixed dimension every entry and query vector must match.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether the one-time build has completed.
    pub fn is_built(&self) -> bool {
        self.entries.initialized()
    }

    /// Number of indexed entries, if the index has been built.
    pub fn len(&self) -> Option<usize> {
        self.entries.get().map(Vec::len)
    }

    /// Build the index if no caller has yet, otherwise wait for (or reuse)
    /// the existing build. Cancellation is observed while waiting; a
    /// cancelled caller never observes (or commits) a half-built index: a
    /// build abandoned by cancellation leaves the cell unset, and the next
    /// caller starts a fresh pass.
    pub async fn ensure_built(&self, cancel: &CancelToken) -> Result<&[IndexEntry], RagError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RagError::Cancelled),
            result = self.entries.get_or_try_init(|| self.build(cancel.clone())) => {
                result.map(Vec::as_slice)
            }
        }
    }

    /// Top-K search for a text query.
    ///
    /// The query vector is resolved through the guarded embedding provider;
    /// resolution failures affect this request only and propagate to the
    /// caller. An empty index short-circuits to an empty result without
    /// touching the provider.
    pub async fn search_text(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Document>, RagError> {
        let entries = self.ensure_built(cancel).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let query_vector = self.embedder.embed(query, cancel).await?;
        if query_vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                got: query_vector.len(),
            });
        }
        let documents = ranker::top_k(entries, &query_vector, top_k);
        info!(
            elapsed = ?started.elapsed(),
            top_k,
            results = documents.len(),
            "search finished"
        );
        Ok(documents)
    }

    /// Top-K search for a precomputed query vector.
    pub async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Document>, RagError> {
        let entries = self.ensure_built(cancel).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                got: query_vector.len(),
            });
        }
        Ok(ranker::top_k(entries, query_vector, top_k))
    }

    async fn build(&self, cancel: CancelToken) -> Result<Vec<IndexEntry>, RagError> {
        let started = Instant::now();
        let items = match self.source.enumerate().await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "corpus enumeration failed, building empty index");
                Vec::new()
            }
        };
        info!(files = items.len(), "index initialisation");

        let mut entries = Vec::with_capacity(items.len());
        for (id, (filename, text)) in items.into_iter().enumerate() {
            match self.embedder.embed(&text, &cancel).await {
                Ok(vector) if vector.len() == self.dimension => {
                    let norm = l2_norm(&vector);
                    debug!(file = %filename, "embedded");
                    entries.push(IndexEntry {
                        document: Document { id, filename, text },
                        vector,
                        norm,
                    });
                }
                Ok(vector) => {
                    error!(
                        file = %filename,
                        expected = self.dimension,
                        got = vector.len(),
                        "embedding dimension mismatch, skipping document"
                    );
                }
                Err(ResilienceError::CircuitOpen) => {
                    warn!(file = %filename, "circuit open while indexing, stopping this pass");
                    break;
                }
                Err(ResilienceError::Cancelled) => return Err(RagError::Cancelled),
                Err(err) => {
                    error!(
                        file = %filename,
                        error = %err,
                        "failed to embed document, continuing with the rest"
                    );
                }
            }
        }

        info!(
            documents = entries.len(),
            elapsed = ?started.elapsed(),
            "index ready"
        );
        Ok(entries)
    }
}
