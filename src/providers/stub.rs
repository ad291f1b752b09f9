//! Deterministic local providers for development and tests.

use std::hash::Hasher;

use async_trait::async_trait;
use rustc_hash::FxHasher;

use super::{EmbeddingProvider, GenerationProvider, ProviderError};
use crate::document::Document;

/// Number of signed hash buckets each token contributes to.
const FEATURES_PER_TOKEN: u8 = 3;

/// Deterministic bag-of-tokens embedder.
///
/// Each lowercased alphanumeric token is feature-hashed into
/// [`FEATURES_PER_TOKEN`] signed buckets of a fixed-dimension vector, so
/// texts sharing tokens land close under cosine similarity while disjoint
/// texts stay near orthogonal. The hash is [`FxHasher`], which is stable
/// across processes and platforms, making scores reproducible.
#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidInput(
                "text must not be empty".into(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let token = token.to_lowercase();
            for seed in 0..FEATURES_PER_TOKEN {
                let mut hasher = FxHasher::default();
                hasher.write_u8(seed);
                hasher.write(token.as_bytes());
                let hash = hasher.finish();

                let bucket = (hash % self.dimension as u64) as usize;
                let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
                vector[bucket] += sign;
            }
        }
        Ok(vector)
    }
}

/// Deterministic generator that echoes the query and names its sources.
#[derive(Clone, Debug, Default)]
pub struct StubGenerator;

impl StubGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationProvider for StubGenerator {
    async fn generate(
        &self,
        query: &str,
        documents: &[Document],
    ) -> Result<String, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::InvalidInput(
                "query must not be empty".into(),
            ));
        }

        let sources: Vec<&str> = documents
            .iter()
            .map(|document| document.filename.as_str())
            .collect();
        Ok(format!(
            "You asked: \"{query}\". Context docs: {}.",
            sources.join(", ")
        ))
    }
}
