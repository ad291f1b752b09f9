//! Configuration consumed, not owned, by the retrieval core.
//!
//! Every knob has a production-shaped default; [`RagConfig::from_env`] layers
//! environment overrides (via `dotenvy`) on top, and the `with_*` builders
//! cover programmatic composition. The core components each take their own
//! config slice by value, so hosts can also wire them independently.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::inbound::InboundLimiterConfig;
use crate::resilience::{BreakerConfig, OutboundLimiterConfig, RetryConfig};

/// Which provider implementation to stand behind the capability traits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Deterministic local stub, no network.
    #[default]
    Stub,
    /// Remote HTTP provider.
    Remote,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" | "mock" | "local" => Ok(Self::Stub),
            "remote" | "openai" => Ok(Self::Remote),
            other => Err(format!("unknown provider kind '{other}'")),
        }
    }
}

/// Settings for the remote HTTP provider.
#[derive(Clone, Debug)]
pub struct RemoteProviderConfig {
    pub base_url: Url,
    pub api_key: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Per-request timeout applied at the transport layer.
    pub timeout: Duration,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/").expect("static url parses"),
            api_key: String::new(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level configuration for [`RagService`](crate::service::RagService).
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Directory the filesystem corpus reads `*.txt` files from.
    pub corpus_dir: PathBuf,
    /// Fixed dimension `D` every index entry and query vector must match.
    pub embedding_dimension: usize,
    pub provider: ProviderKind,
    pub remote: RemoteProviderConfig,
    pub breaker: BreakerConfig,
    pub retry: RetryConfig,
    pub inbound: InboundLimiterConfig,
    pub outbound: OutboundLimiterConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("data"),
            embedding_dimension: 384,
            provider: ProviderKind::default(),
            remote: RemoteProviderConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryConfig::default(),
            inbound: InboundLimiterConfig::default(),
            outbound: OutboundLimiterConfig::default(),
        }
    }
}

impl RagConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// Recognised variables: `RAGWEAVE_CORPUS_DIR`, `RAGWEAVE_PROVIDER`,
    /// `RAGWEAVE_EMBEDDING_DIMENSION`, `OPENAI_BASE_URL`, `OPENAI_API_KEY`,
    /// `OPENAI_EMBEDDING_MODEL`, `OPENAI_CHAT_MODEL`. Unparseable values are
    /// logged and fall back to the default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("RAGWEAVE_CORPUS_DIR") {
            config.corpus_dir = PathBuf::from(dir);
        }
        if let Ok(kind) = std::env::var("RAGWEAVE_PROVIDER") {
            match kind.parse() {
                Ok(kind) => config.provider = kind,
                Err(err) => warn!(%err, "ignoring RAGWEAVE_PROVIDER"),
            }
        }
        if let Ok(dimension) = std::env::var("RAGWEAVE_EMBEDDING_DIMENSION") {
            match dimension.parse::<usize>() {
                Ok(dimension) if dimension > 0 => config.embedding_dimension = dimension,
                _ => warn!(%dimension, "ignoring RAGWEAVE_EMBEDDING_DIMENSION"),
            }
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            match Url::parse(&base_url) {
                Ok(url) => config.remote.base_url = url,
                Err(err) => warn!(%err, "ignoring OPENAI_BASE_URL"),
            }
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config.remote.api_key = api_key;
        }
        if let Ok(model) = std::env::var("OPENAI_EMBEDDING_MODEL") {
            config.remote.embedding_model = model;
        }
        if let Ok(model) = std::env::var("OPENAI_CHAT_MODEL") {
            config.remote.chat_model = model;
        }
        config
    }

    #[must_use]
    pub fn with_corpus_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.corpus_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_inbound(mut self, inbound: InboundLimiterConfig) -> Self {
        self.inbound = inbound;
        self
    }

    #[must_use]
    pub fn with_outbound(mut self, outbound: OutboundLimiterConfig) -> Self {
        self.outbound = outbound;
        self
    }
}
