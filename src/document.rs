//! Corpus documents and the sources that enumerate them.
//!
//! A [`CorpusSource`] yields immutable `(filename, text)` pairs exactly once,
//! at index-build time. The items are treated as opaque text; an empty
//! enumeration is a valid outcome (the index is simply built empty), and a
//! missing corpus location is reported the same way rather than as an error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

/// A document retrieved from the corpus, immutable once loaded.
///
/// `id` is the document's position in corpus enumeration order. It is
/// assigned when the corpus is enumerated, before any per-document skip
/// decisions, so identifiers stay stable even when some documents fail to
/// embed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: usize,
    pub filename: String,
    pub text: String,
}

/// Errors raised while enumerating a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
}

/// Finite source of `(filename, text)` pairs consumed at index-build time.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<(String, String)>, CorpusError>;
}

/// Corpus backed by a directory of `*.txt` files.
///
/// Files are read in filename order so that enumeration (and therefore
/// document ids and ranking tie-breaks) is deterministic across platforms.
/// A missing directory yields an empty enumeration with a logged warning.
#[derive(Clone, Debug)]
pub struct FsCorpus {
    dir: PathBuf,
}

impl FsCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CorpusSource for FsCorpus {
    async fn enumerate(&self) -> Result<Vec<(String, String)>, CorpusError> {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "corpus directory not found, continuing with empty corpus");
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "txt") && path.is_file() {
                names.push(path);
            }
        }
        names.sort();

        let mut documents = Vec::with_capacity(names.len());
        for path in names {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = fs::read_to_string(&path).await?;
            documents.push((filename, text));
        }
        Ok(documents)
    }
}

/// In-memory corpus for tests and hosts that do not load from disk.
#[derive(Clone, Debug, Default)]
pub struct MemoryCorpus {
    items: Vec<(String, String)>,
}

impl MemoryCorpus {
    pub fn new(items: Vec<(String, String)>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn with_document(mut self, filename: impl Into<String>, text: impl Into<String>) -> Self {
        self.items.push((filename.into(), text.into()));
        self
    }
}

#[async_trait]
impl CorpusSource for MemoryCorpus {
    async fn enumerate(&self) -> Result<Vec<(String, String)>, CorpusError> {
        Ok(self.items.clone())
    }
}
