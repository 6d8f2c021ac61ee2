//! Embedding configuration types.

use policyqa_core::{AppConfig, AppError, AppResult};
use std::time::Duration;

/// Embedding settings resolved from application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Optional custom base URL
    pub endpoint: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl EmbeddingConfig {
    /// Offline trigram settings, used for development and tests.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: super::providers::trigram::TRIGRAM_MODEL.to_string(),
            dimensions,
            endpoint: None,
            timeout: Duration::from_secs(1),
        }
    }

    /// Resolve embedding settings from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            provider: config.embedding_provider.clone(),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            endpoint: config.embedding_endpoint.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Ensure an existing index was built with the same model and
    /// dimensions, since vectors from different models aren't comparable.
    pub fn validate_consistency(&self, index_model: &str, index_dimension: usize) -> AppResult<()> {
        if self.model != index_model || self.dimensions != index_dimension {
            return Err(AppError::Config(format!(
                "Index was built with model '{}' ({} dims) but '{}' ({} dims) is configured. \
                 Re-run ingestion with --rebuild to re-embed.",
                index_model, index_dimension, self.model, self.dimensions
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config() {
        let mut app = AppConfig::default();
        app.embedding_provider = "ollama".to_string();
        app.embedding_model = "nomic-embed-text".to_string();
        app.embedding_dimensions = 768;
        app.request_timeout_secs = 5;

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_consistency() {
        let config = EmbeddingConfig::default();
        assert!(config
            .validate_consistency("text-embedding-3-small", 1536)
            .is_ok());

        let err = config
            .validate_consistency("nomic-embed-text", 768)
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("--rebuild"));
    }
}
