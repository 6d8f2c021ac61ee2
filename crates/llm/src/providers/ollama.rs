//! Ollama chat provider implementation.
//!
//! Ollama is a local LLM runtime, useful for answering policy questions
//! without sending excerpts to a hosted service.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http::{build_http_client, chat_status_error, transport_error};
use policyqa_core::{AppError, AppResult, Stage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Body of `POST /api/generate`. Always sent with `stream: false`, so the
/// reply arrives as a single JSON object.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Sampling options nested under `options` in the Ollama API.
#[derive(Debug, Serialize, PartialEq)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama chat client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_http_client(timeout)?,
        })
    }

    fn to_generate_request<'a>(&self, request: &'a LlmRequest) -> GenerateRequest<'a> {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }
        });

        GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            options,
            stream: false,
        }
    }

    fn convert_response(&self, response: GenerateResponse) -> LlmResponse {
        LlmResponse {
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
            truncated: response.done_reason.as_deref() == Some("length"),
            content: response.response,
            model: response.model,
        }
    }

    async fn send(&self, body: &GenerateRequest<'_>) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(Stage::Generation, "Ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(chat_status_error("Ollama", status, &error_text));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Ollama");

        let response = self.send(&self.to_generate_request(request)).await?;
        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AppError::GenerationFailed(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            "Received completion from Ollama ({} chars, {} completion tokens)",
            parsed.response.len(),
            parsed.eval_count.unwrap_or(0)
        );

        Ok(self.convert_response(parsed))
    }
}
