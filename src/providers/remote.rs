//! HTTP-based providers speaking the OpenAI wire shape.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use super::{EmbeddingProvider, GenerationProvider, ProviderError};
use crate::config::RemoteProviderConfig;
use crate::document::Document;

/// Embedding provider backed by a `v1/embeddings` endpoint.
#[derive(Clone, Debug)]
pub struct RemoteEmbedder {
    http: reqwest::Client,
    config: RemoteProviderConfig,
}

impl RemoteEmbedder {
    pub fn new(config: RemoteProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidInput(
                "text must not be empty".into(),
            ));
        }
        info!(chars = text.len(), "requesting embedding");

        let payload = json!({
            "input": text,
            "model": self.config.embedding_model,
        });
        let body = send_json(
            &self.http,
            &self.config,
            "v1/embeddings",
            &payload,
        )
        .await?;

        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|err| ProviderError::Malformed(format!("embedding payload: {err}")))?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| ProviderError::Malformed("no embedding data returned".into()))?;

        info!(dimension = embedding.len(), "received embedding vector");
        Ok(embedding)
    }
}

/// Generation provider backed by a `v1/chat/completions` endpoint.
///
/// The context documents become the system prompt, the query the user turn,
/// so the answer stays grounded in the retrieved corpus.
#[derive(Clone, Debug)]
pub struct RemoteGenerator {
    http: reqwest::Client,
    config: RemoteProviderConfig,
}

impl RemoteGenerator {
    pub fn new(config: RemoteProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl GenerationProvider for RemoteGenerator {
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

        let system_prompt = documents
            .iter()
            .map(|document| document.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        info!(documents = documents.len(), "requesting grounded answer");

        let payload = json!({
            "model": self.config.chat_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": query },
            ],
        });
        let body = send_json(
            &self.http,
            &self.config,
            "v1/chat/completions",
            &payload,
        )
        .await?;

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| ProviderError::Malformed(format!("chat payload: {err}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("no chat response returned".into()))?;

        Ok(content.trim().to_string())
    }
}

async fn send_json(
    http: &reqwest::Client,
    config: &RemoteProviderConfig,
    path: &str,
    payload: &serde_json::Value,
) -> Result<String, ProviderError> {
    let endpoint = endpoint(&config.base_url, path)?;
    let response = http
        .post(endpoint)
        .bearer_auth(&config.api_key)
        .timeout(config.timeout)
        .json(payload)
        .send()
        .await
        .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

    if !status.is_success() {
        warn!(status = status.as_u16(), body = %body, "provider returned an error response");
        return Err(classify_status(status, &body));
    }
    Ok(body)
}

fn endpoint(base: &Url, path: &str) -> Result<Url, ProviderError> {
    base.join(path)
        .map_err(|err| ProviderError::InvalidInput(format!("bad provider endpoint: {err}")))
}

fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("{}: {}", status.as_u16(), truncate(body, 200));
    if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited(detail)
    } else if status.is_server_error() {
        ProviderError::Unavailable(detail)
    } else if status.is_client_error() {
        ProviderError::InvalidInput(detail)
    } else {
        ProviderError::Malformed(detail)
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}
