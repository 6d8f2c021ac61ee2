//! Embedding provider implementations.

pub mod ollama;
pub mod openai;
pub mod trigram;

pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
pub use trigram::TrigramProvider;
