//! Embedding stage.
//!
//! [`Embedder`] wraps a provider with batching, bounded concurrency, retry
//! and result validation. Everything downstream relies on vectors coming out
//! of it in input order and with the provider's declared dimension.

pub mod config;
pub mod provider;
pub mod providers;
pub mod retry;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
pub use retry::RetryPolicy;

use futures::stream::{self, StreamExt, TryStreamExt};
use policyqa_core::{AppError, AppResult, Stage};
use std::sync::Arc;

/// Batches texts through an embedding provider.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    concurrency: usize,
    retry: RetryPolicy,
}

impl Embedder {
    /// Create an embedder with a batch size of 64 and 4 requests in flight.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: 64,
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed texts, returning one vector per text in input order.
    ///
    /// Batches are sent concurrently but results are reassembled in order.
    /// The first batch to fail fails the whole call.
    pub async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(AppError::invalid_input(
                Stage::Embedding,
                format!("Cannot embed empty text (input {})", pos),
            ));
        }

        tracing::info!(
            "Embedding {} texts with provider '{}' (model: {}, batch size: {})",
            texts.len(),
            self.provider_name(),
            self.model_name(),
            self.batch_size
        );

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| self.embed_batch_checked(batch))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Embed a single query text.
    pub async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            AppError::invalid_input(Stage::Embedding, "No embedding returned for query")
        })
    }

    async fn embed_batch_checked(&self, batch: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let vectors = self
            .retry
            .run(|| self.provider.embed_batch(batch))
            .await?;

        if vectors.len() != batch.len() {
            return Err(AppError::invalid_input(
                Stage::Embedding,
                format!(
                    "Provider '{}' returned {} embeddings for {} texts",
                    self.provider_name(),
                    vectors.len(),
                    batch.len()
                ),
            ));
        }

        let expected = self.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(AppError::invalid_input(
                Stage::Embedding,
                format!(
                    "Provider '{}' returned a {}-dimensional embedding, expected {}",
                    self.provider_name(),
                    bad.len(),
                    expected
                ),
            ));
        }

        tracing::debug!("Embedded batch of {} texts", batch.len());
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Provider that encodes each text's length and records batch sizes.
    #[derive(Debug, Default)]
    struct LengthProvider {
        calls: AtomicUsize,
        fail_first: bool,
        short_by: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn provider_name(&self) -> &str {
            "length"
        }

        fn model_name(&self) -> &str {
            "length-v1"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(AppError::transient(Stage::Embedding, "rate limited"));
            }
            let count = texts.len().saturating_sub(self.short_by);
            Ok(texts[..count]
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (1..=n).map(|i| "x".repeat(i)).collect()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_batches_preserve_input_order() {
        let provider = Arc::new(LengthProvider::default());
        let embedder = Embedder::new(provider.clone())
            .with_batch_size(3)
            .with_concurrency(4);

        let vectors = embedder.embed_texts(&texts(10)).await.unwrap();
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();

        assert_eq!(lengths, (1..=10).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_transient_batch_failure_is_retried() {
        let provider = Arc::new(LengthProvider {
            fail_first: true,
            ..Default::default()
        });
        let embedder = Embedder::new(provider.clone()).with_retry(fast_retry());

        let vectors = embedder.embed_texts(&texts(2)).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_invalid_input() {
        let provider = Arc::new(LengthProvider {
            short_by: 1,
            ..Default::default()
        });
        let embedder = Embedder::new(provider).with_retry(fast_retry());

        let err = embedder.embed_texts(&texts(3)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidInput {
                stage: Stage::Embedding,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let embedder = Embedder::new(Arc::new(TrigramProvider::new(16)));
        let err = embedder
            .embed_texts(&["ok".to_string(), "  ".to_string()])
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let provider = Arc::new(LengthProvider::default());
        let embedder = Embedder::new(provider.clone());
        assert!(embedder.embed_texts(&[]).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_query() {
        let embedder = Embedder::new(Arc::new(TrigramProvider::new(32)));
        let vector = embedder.embed_query("annual leave policy").await.unwrap();
        assert_eq!(vector.len(), 32);
    }
}
