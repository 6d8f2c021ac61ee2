//! Ollama embedding provider.
//!
//! Calls the local `/api/embeddings` endpoint once per text, since the API
//! takes a single prompt per request. Retries are left to the caller.

use crate::embeddings::provider::EmbeddingProvider;
use async_trait::async_trait;
use policyqa_core::{AppResult, Stage};
use policyqa_llm::http::{build_http_client, decode_error, status_error, transport_error};
use policyqa_llm::providers::ollama::DEFAULT_OLLAMA_URL;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";
const SERVICE: &str = "Ollama embeddings";

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbeddingProvider {
    /// Create a provider. `base_url` defaults to the local Ollama daemon.
    pub fn new(
        base_url: Option<&str>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            dimensions,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(Stage::Embedding, SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(status_error(Stage::Embedding, SERVICE, status, &detail));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(Stage::Embedding, SERVICE, e))?;
        let embedding = parse_embedding(&body)?;

        debug!("Generated {} dimensional embedding", embedding.len());
        Ok(embedding)
    }
}

fn parse_embedding(body: &str) -> AppResult<Vec<f32>> {
    serde_json::from_str::<EmbeddingResponse>(body)
        .map(|r| r.embedding)
        .map_err(|e| decode_error(Stage::Embedding, SERVICE, e))
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_single(text).await?);
        }
        Ok(embeddings)
    }
}
