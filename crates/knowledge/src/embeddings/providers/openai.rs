//! OpenAI embedding provider using the `/embeddings` API.

use crate::embeddings::provider::EmbeddingProvider;
use async_trait::async_trait;
use policyqa_core::{AppError, AppResult, Stage};
use policyqa_llm::http::{build_http_client, decode_error, status_error, transport_error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

const SERVICE: &str = "OpenAI embeddings";

/// Embedding provider backed by the OpenAI embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider. `base_url` defaults to the public OpenAI API.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Config("OpenAI API key must not be empty".to_string()));
        }

        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            base_url: base_url
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            dimensions,
        })
    }
}

/// Decode a success body into embeddings in input order.
fn parse_embeddings(body: &str, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    let parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| decode_error(Stage::Embedding, SERVICE, e))?;
    order_embeddings(parsed.data, expected)
}

/// Put embeddings back into input order using the response's `index` field.
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    data.sort_by_key(|d| d.index);
    let in_range = data.iter().enumerate().all(|(i, d)| d.index == i);
    if data.len() != expected || !in_range {
        return Err(AppError::invalid_input(
            Stage::Embedding,
            format!(
                "{} returned {} embeddings for {} inputs",
                SERVICE,
                data.len(),
                expected
            ),
        ));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(Stage::Embedding, SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(status_error(Stage::Embedding, SERVICE, status, &detail));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(Stage::Embedding, SERVICE, e))?;

        parse_embeddings(&body, texts.len())
    }
}
