//! Provider and corpus doubles shared across integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragweave::document::{CorpusError, CorpusSource, MemoryCorpus};
use ragweave::providers::{EmbeddingProvider, ProviderError, StubEmbedder};
use tokio::time::Instant;

/// Embedder that fails with the scripted errors first, then behaves like the
/// deterministic stub. Records every invocation and its timestamp.
pub struct FlakyEmbedder {
    inner: StubEmbedder,
    failures: Mutex<VecDeque<ProviderError>>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl FlakyEmbedder {
    pub fn new(dimension: usize, failures: Vec<ProviderError>) -> Self {
        Self {
            inner: StubEmbedder::new(dimension),
            failures: Mutex::new(failures.into()),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub fn reliable(dimension: usize) -> Self {
        Self::new(dimension, Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.inner.embed(text).await
    }
}

/// Corpus wrapper counting how many times it was enumerated.
pub struct CountingCorpus {
    inner: MemoryCorpus,
    enumerations: AtomicUsize,
}

impl CountingCorpus {
    pub fn new(inner: MemoryCorpus) -> Self {
        Self {
            inner,
            enumerations: AtomicUsize::new(0),
        }
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CorpusSource for CountingCorpus {
    async fn enumerate(&self) -> Result<Vec<(String, String)>, CorpusError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        self.inner.enumerate().await
    }
}
