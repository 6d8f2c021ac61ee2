//! Chat completion contract shared by every provider.
//!
//! Answers are produced in one round trip: the generator sends a system
//! preamble plus a user turn and waits for the whole reply.

use policyqa_core::AppResult;

/// One chat completion: a system preamble, a user turn and sampling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the reply length. Providers that ignore the cap still accept it.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Reply to an [`LlmRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: String,

    /// Model that actually answered, as reported by the provider
    pub model: String,

    pub usage: LlmUsage,

    /// The provider stopped at the token limit rather than at a natural end
    pub truncated: bool,
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A chat model the answer generator can send prompts to.
///
/// Implementations classify failures themselves: retryable service faults
/// as `TransientService { stage: Generation }`, everything else as
/// `GenerationFailed`.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider identifier, used in logs.
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
