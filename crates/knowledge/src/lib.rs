//! Policy question answering over a local document collection.
//!
//! Documents are split into page-attributed chunks, embedded, and kept in a
//! vector index persisted to SQLite. Questions are answered by retrieving
//! the closest chunks and asking a chat model to answer from them alone,
//! with citations back to document pages.
//!
//! The free functions here drive a [`KnowledgeBase`] from [`AppConfig`];
//! library users who want their own providers build one directly.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod rag;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::Chunker;
pub use config::PipelineConfig;
pub use embeddings::{Embedder, EmbeddingConfig, EmbeddingProvider, RetryPolicy};
pub use index::VectorIndex;
pub use pipeline::KnowledgeBase;
pub use rag::AnswerGenerator;
pub use retriever::Retriever;
pub use types::{
    Answer, Chunk, Citation, CitationMode, Document, IndexEntry, IndexStats, IngestStats, Page,
    RetrievalResult, ScoredChunk,
};

use policyqa_core::{AppConfig, AppError, AppResult};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Open the configured collection with the configured providers.
pub fn open(app: &AppConfig) -> AppResult<KnowledgeBase> {
    build(app, false)
}

fn build(app: &AppConfig, fresh: bool) -> AppResult<KnowledgeBase> {
    let pipeline = config::load_config(&app.workspace, &app.collection)?;
    let api_key = app.resolve_api_key();

    let embedding = EmbeddingConfig::from_app_config(app);
    let provider = embeddings::create_provider(&embedding, api_key.as_deref())?;

    let llm = policyqa_llm::create_client(
        &app.provider,
        app.endpoint.as_deref(),
        api_key.as_deref(),
        Duration::from_secs(app.request_timeout_secs),
    )?;

    tracing::debug!(
        "Opening collection '{}' (embeddings: {}/{}, chat: {}/{})",
        pipeline.collection,
        embedding.provider,
        embedding.model,
        app.provider,
        app.model
    );

    let embedder = Embedder::new(provider);
    if fresh {
        KnowledgeBase::create(&app.workspace, pipeline, embedder, llm, &app.model)
    } else {
        KnowledgeBase::open(&app.workspace, pipeline, embedder, llm, &app.model)
    }
}

/// Ingest every document under `dir` into the configured collection.
///
/// With `rebuild` the collection starts from an empty index, which is also
/// the way to switch embedding models. The previous index is only replaced
/// once the new one has been written, so a failed run leaves it in place.
pub async fn ingest(app: &AppConfig, dir: &Path, rebuild: bool) -> AppResult<IngestStats> {
    tracing::info!("Starting ingestion of {:?} into '{}'", dir, app.collection);

    let documents = loader::load_documents(dir)?;

    let kb = build(app, rebuild)?;
    let stats = kb.ingest(&documents).await?;
    config::save_config(&app.workspace, kb.config())?;
    kb.close()?;

    Ok(stats)
}

/// Answer a question from the configured collection.
///
/// With `docs`, an empty collection is ingested from that directory first.
/// An empty collection otherwise yields the "no relevant context" answer.
pub async fn ask(
    app: &AppConfig,
    question: &str,
    top_k: Option<usize>,
    docs: Option<&Path>,
) -> AppResult<Answer> {
    let kb = open(app)?;

    if let Some(dir) = docs {
        if kb.ensure_ingested(dir, false).await?.is_some() {
            config::save_config(&app.workspace, kb.config())?;
            kb.persist()?;
        }
    }

    if kb.index().is_empty()? {
        tracing::warn!(
            "Collection '{}' has no indexed documents. Run 'policyqa ingest' first.",
            app.collection
        );
    }

    kb.query(question, top_k).await
}

/// Statistics for the configured collection's persisted index.
pub fn stats(app: &AppConfig) -> AppResult<IndexStats> {
    let path = config::get_index_path(&app.workspace, &app.collection);
    if !path.exists() {
        return Err(AppError::NotFound(format!(
            "Collection '{}' does not exist",
            app.collection
        )));
    }

    VectorIndex::load(&path)?.stats(&app.collection)
}

/// Delete the configured collection's index and settings.
pub fn clean(app: &AppConfig) -> AppResult<()> {
    let dir = config::get_collection_dir(&app.workspace, &app.collection);
    if !dir.exists() {
        return Err(AppError::NotFound(format!(
            "Collection '{}' does not exist",
            app.collection
        )));
    }

    fs::remove_dir_all(&dir)?;
    tracing::info!("Collection '{}' cleaned", app.collection);
    Ok(())
}
