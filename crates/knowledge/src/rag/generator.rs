//! Grounded answer generation.

use crate::rag::citations::extract_citations;
use crate::types::{Answer, RetrievalResult};
use policyqa_core::{AppError, AppResult};
use policyqa_llm::{LlmClient, LlmRequest};
use policyqa_prompt::{Excerpt, PromptComposer};
use std::sync::Arc;

/// Default sampling temperature; low, since answers should stick to the text.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Turns a question plus retrieved chunks into a cited answer.
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    composer: PromptComposer,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl AnswerGenerator {
    /// Create a generator with the default prompt template.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client,
            model: model.into(),
            composer: PromptComposer::new()?,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        })
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate an answer from `retrieval`, in the retriever's order.
    ///
    /// With nothing retrieved the chat model is not called and the
    /// "no relevant context" answer is returned. Transient service failures
    /// pass through unchanged; any other model failure, or an empty reply,
    /// is [`AppError::GenerationFailed`].
    pub async fn generate(&self, question: &str, retrieval: &RetrievalResult) -> AppResult<Answer> {
        if retrieval.is_empty() {
            tracing::info!("No context retrieved, skipping generation");
            return Ok(Answer::no_relevant_context());
        }

        let excerpts: Vec<Excerpt> = retrieval
            .iter()
            .enumerate()
            .map(|(i, hit)| Excerpt::ranked(i + 1, &hit.chunk.document, hit.chunk.page, &hit.chunk.text))
            .collect();
        let prompt = self.composer.compose(question, &excerpts)?;

        let mut request = LlmRequest::new(prompt.user, &self.model)
            .with_system(prompt.system)
            .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            "Generating answer with {} (model: {}, excerpts: {})",
            self.client.provider_name(),
            self.model,
            prompt.excerpt_count
        );

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::TransientService { .. } | AppError::GenerationFailed(_) => e,
            other => AppError::GenerationFailed(other.to_string()),
        })?;

        if response.truncated {
            tracing::warn!(
                "Answer from {} hit the token limit and may be cut short",
                response.model
            );
        }

        let text = response.content.trim();
        if text.is_empty() {
            return Err(AppError::GenerationFailed(
                "Chat model returned an empty answer".to_string(),
            ));
        }

        let (citations, citation_mode) = extract_citations(text, &retrieval.hits);

        tracing::info!(
            "Generated answer ({} chars, {} citations, {:?})",
            text.len(),
            citations.len(),
            citation_mode
        );

        Ok(Answer {
            text: text.to_string(),
            citations,
            citation_mode,
            grounded: true,
            retrieved: retrieval.hits.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{hit, StubLlm};
    use crate::types::CitationMode;
    use policyqa_core::Stage;

    fn retrieval() -> RetrievalResult {
        RetrievalResult::new(vec![
            hit("leave.pdf", 3, "Employees accrue 18 days of earned leave."),
            hit("travel.pdf", 1, "Economy class for flights under 6 hours."),
        ])
    }

    #[tokio::test]
    async fn test_prompt_carries_excerpts_in_order() {
        let llm = Arc::new(StubLlm::replying("You get 18 days [S1]."));
        let generator = AnswerGenerator::new(llm.clone(), "gpt-4o-mini").unwrap();

        generator.generate("How much leave?", &retrieval()).await.unwrap();

        let request = llm.last_request().unwrap();
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.temperature, Some(DEFAULT_TEMPERATURE));
        assert!(request.system.unwrap().contains("Answer ONLY"));
        let leave = request.prompt.find("earned leave").unwrap();
        let travel = request.prompt.find("Economy class").unwrap();
        assert!(leave < travel);
        assert!(request.prompt.contains("How much leave?"));
    }

    #[tokio::test]
    async fn test_explicit_citations() {
        let llm = Arc::new(StubLlm::replying("You get 18 days [S1]."));
        let generator = AnswerGenerator::new(llm, "m").unwrap();

        let answer = generator.generate("How much leave?", &retrieval()).await.unwrap();
        assert!(answer.grounded);
        assert_eq!(answer.citation_mode, CitationMode::Explicit);
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].document, "leave.pdf");
        assert_eq!(answer.citations[0].page, 3);
    }

    #[tokio::test]
    async fn test_unmarked_answer_lists_sources_consulted() {
        let llm = Arc::new(StubLlm::replying("You get 18 days."));
        let generator = AnswerGenerator::new(llm, "m").unwrap();

        let answer = generator.generate("How much leave?", &retrieval()).await.unwrap();
        assert_eq!(answer.citation_mode, CitationMode::SourcesConsulted);
        assert_eq!(answer.citations.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_retrieval_skips_model() {
        let llm = Arc::new(StubLlm::replying("should not be used"));
        let generator = AnswerGenerator::new(llm.clone(), "m").unwrap();

        let answer = generator
            .generate("Is there a gym?", &RetrievalResult::empty())
            .await
            .unwrap();
        assert!(!answer.grounded);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_reply_is_generation_failure() {
        let llm = Arc::new(StubLlm::replying("   \n"));
        let generator = AnswerGenerator::new(llm, "m").unwrap();

        let err = generator.generate("q", &retrieval()).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_transient_failure_passes_through() {
        let llm = Arc::new(StubLlm::failing(AppError::transient(Stage::Generation, "429")));
        let generator = AnswerGenerator::new(llm, "m").unwrap();

        let err = generator.generate("q", &retrieval()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_other_failure_becomes_generation_failure() {
        let llm = Arc::new(StubLlm::failing(AppError::Other("boom".to_string())));
        let generator = AnswerGenerator::new(llm, "m").unwrap();

        let err = generator.generate("q", &retrieval()).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_max_tokens_forwarded() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let generator = AnswerGenerator::new(llm.clone(), "m")
            .unwrap()
            .with_max_tokens(Some(256));

        generator.generate("q", &retrieval()).await.unwrap();
        assert_eq!(llm.last_request().unwrap().max_tokens, Some(256));
    }
}
