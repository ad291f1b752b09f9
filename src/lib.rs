//! # Ragweave: Grounded Retrieval with a Resilient Provider Boundary
//!
//! Ragweave answers a text query by retrieving the K most semantically
//! similar documents from a small, fixed corpus, and can ask a generation
//! provider for an answer grounded in those documents. The heart of the
//! crate is the retrieval engine and the machinery that keeps it healthy
//! when its providers are not:
//!
//! - **Vector index** ([`index`]): built lazily, exactly once, behind a
//!   single-flight guard; immutable and lock-free to read afterwards.
//!   Ranking is cosine similarity with a stable, insertion-order tie-break.
//! - **Resilience** ([`resilience`]): every provider call runs through an
//!   outbound rate limiter, a jittered exponential retry, and a circuit
//!   breaker, composed as a decorator so call sites never see policy logic.
//! - **Inbound limiting** ([`inbound`]): per-client fixed-window admission
//!   control for the transport boundary, with optional FIFO queueing.
//! - **Providers** ([`providers`]): the embedding/generation contracts plus
//!   a deterministic local stub and an OpenAI-style remote implementation,
//!   selected by configuration.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ragweave::{CancelToken, RagConfig, RagService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads *.txt documents from the configured corpus directory and
//!     // uses the deterministic stub providers by default.
//!     let service = RagService::from_config(&RagConfig::from_env())?;
//!
//!     let cancel = CancelToken::new();
//!     let documents = service.search("quick brown fox", 3, &cancel).await?;
//!     for document in &documents {
//!         println!("{}", document.filename);
//!     }
//!
//!     let answer = service
//!         .generate_answer("quick brown fox", &documents, &cancel)
//!         .await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Degradation model
//!
//! The index build is best-effort: an absent corpus builds an empty index, a
//! document that fails to embed is skipped and logged, and a circuit-breaker
//! trip truncates the remaining batch instead of failing the build. Query
//! failures stay scoped to their request; nothing a single request does can
//! corrupt the shared index.

pub mod cancel;
pub mod config;
pub mod document;
pub mod errors;
pub mod inbound;
pub mod index;
pub mod providers;
pub mod resilience;
pub mod service;

pub use cancel::CancelToken;
pub use config::{ProviderKind, RagConfig, RemoteProviderConfig};
pub use document::{CorpusSource, Document, FsCorpus, MemoryCorpus};
pub use errors::RagError;
pub use inbound::{InboundLimiterConfig, InboundRateLimiter, InboundRejection};
pub use service::{DEFAULT_TOP_K, RagService};
