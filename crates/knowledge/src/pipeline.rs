//! End-to-end pipeline: ingest documents, answer questions.
//!
//! [`KnowledgeBase`] owns one collection's index together with the stages
//! that read and write it. There is no global state; every caller builds
//! its own context and passes it around.

use crate::chunker::Chunker;
use crate::config::{self, validate_top_k, PipelineConfig};
use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::loader;
use crate::rag::AnswerGenerator;
use crate::retriever::Retriever;
use crate::types::{Answer, Document, IndexEntry, IndexStats, IngestStats, RetrievalResult};
use policyqa_core::{AppError, AppResult};
use policyqa_llm::LlmClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// One collection's pipeline and index.
pub struct KnowledgeBase {
    config: PipelineConfig,
    chunker: Chunker,
    embedder: Arc<Embedder>,
    index: Arc<VectorIndex>,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl KnowledgeBase {
    /// Open the collection's on-disk index under `workspace`, creating an
    /// empty one if none exists yet.
    pub fn open(
        workspace: &Path,
        config: PipelineConfig,
        embedder: Embedder,
        llm: Arc<dyn LlmClient>,
        chat_model: &str,
    ) -> AppResult<Self> {
        config.validate()?;
        let path = config::get_index_path(workspace, &config.collection);
        let index = VectorIndex::open(&path, embedder.dimensions(), embedder.model_name())?;
        Self::with_index(config, embedder, index, llm, chat_model)
    }

    /// Start the collection over with an empty index.
    ///
    /// Whatever is on disk is left alone until [`persist`](Self::persist),
    /// which swaps the new index in atomically. The existing index may have
    /// been built with a different embedding model.
    pub fn create(
        workspace: &Path,
        config: PipelineConfig,
        embedder: Embedder,
        llm: Arc<dyn LlmClient>,
        chat_model: &str,
    ) -> AppResult<Self> {
        config.validate()?;
        let path = config::get_index_path(workspace, &config.collection);
        let index = VectorIndex::create(&path, embedder.dimensions(), embedder.model_name());
        Self::with_index(config, embedder, index, llm, chat_model)
    }

    /// Build a pipeline over an index that lives only in memory.
    pub fn in_memory(
        config: PipelineConfig,
        embedder: Embedder,
        llm: Arc<dyn LlmClient>,
        chat_model: &str,
    ) -> AppResult<Self> {
        let index = VectorIndex::in_memory(embedder.dimensions(), embedder.model_name());
        Self::with_index(config, embedder, index, llm, chat_model)
    }

    /// Build a pipeline over an existing index.
    ///
    /// The embedder must produce vectors from the same model and with the
    /// same dimension the index was built with.
    pub fn with_index(
        config: PipelineConfig,
        embedder: Embedder,
        index: VectorIndex,
        llm: Arc<dyn LlmClient>,
        chat_model: &str,
    ) -> AppResult<Self> {
        config.validate()?;

        if embedder.dimensions() != index.dimension() || embedder.model_name() != index.model() {
            return Err(AppError::Config(format!(
                "Index was built with model '{}' ({} dims) but the embedder uses '{}' ({} dims). \
                 Re-run ingestion with --rebuild to re-embed.",
                index.model(),
                index.dimension(),
                embedder.model_name(),
                embedder.dimensions()
            )));
        }

        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let embedder = Arc::new(
            embedder
                .with_batch_size(config.embed_batch_size)
                .with_concurrency(config.embed_concurrency),
        );
        let index = Arc::new(index);
        let retriever = Retriever::new(Arc::clone(&embedder), Arc::clone(&index), config.top_k)?;
        let generator = AnswerGenerator::new(llm, chat_model)?
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);

        Ok(Self {
            config,
            chunker,
            embedder,
            index,
            retriever,
            generator,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Chunk, embed and index `documents`.
    ///
    /// Chunks are embedded and inserted one window at a time, so a failure
    /// part way leaves earlier windows indexed. Re-running is safe since
    /// chunk ids are stable.
    pub async fn ingest(&self, documents: &[Document]) -> AppResult<IngestStats> {
        let start = Instant::now();
        let mut stats = IngestStats::default();

        let chunks = self.chunker.chunk_all(documents);
        for doc in documents {
            stats.documents += 1;
            stats.pages += doc.pages.iter().filter(|p| !p.text.trim().is_empty()).count() as u32;
            stats.bytes_processed += doc.text_len() as u64;
        }

        tracing::info!(
            "Ingesting {} documents ({} chunks) into '{}'",
            stats.documents,
            chunks.len(),
            self.config.collection
        );

        for window in chunks.chunks(self.config.insert_batch_size) {
            let texts: Vec<String> = window.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_texts(&texts).await?;

            let entries = window
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
                .collect();
            self.index.insert(entries)?;

            stats.chunks += window.len() as u32;
            tracing::debug!("Indexed {}/{} chunks", stats.chunks, chunks.len());
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Ingestion completed: {} documents, {} pages, {} chunks in {:.2}s",
            stats.documents,
            stats.pages,
            stats.chunks,
            stats.duration_secs
        );

        Ok(stats)
    }

    /// Load every document under `dir` and ingest it. `rebuild` clears the
    /// index first.
    pub async fn ingest_dir(&self, dir: &Path, rebuild: bool) -> AppResult<IngestStats> {
        let documents = loader::load_documents(dir)?;
        if rebuild {
            self.index.clear()?;
        }
        self.ingest(&documents).await
    }

    /// Ingest `dir` only when the index is empty or a rebuild is requested.
    ///
    /// Returns `None` when existing entries were kept.
    pub async fn ensure_ingested(&self, dir: &Path, rebuild: bool) -> AppResult<Option<IngestStats>> {
        if !rebuild && !self.index.is_empty()? {
            tracing::info!(
                "Collection '{}' already has {} entries, skipping ingestion",
                self.config.collection,
                self.index.len()?
            );
            return Ok(None);
        }
        self.ingest_dir(dir, rebuild).await.map(Some)
    }

    /// Retrieve context for `question`, using the configured Top-K unless
    /// one is given.
    pub async fn retrieve(&self, question: &str, top_k: Option<usize>) -> AppResult<RetrievalResult> {
        match top_k {
            Some(k) => {
                validate_top_k(k)?;
                self.retriever.retrieve_top_k(question, k).await
            }
            None => self.retriever.retrieve(question).await,
        }
    }

    /// Answer `question` from the indexed documents.
    pub async fn query(&self, question: &str, top_k: Option<usize>) -> AppResult<Answer> {
        let retrieval = self.retrieve(question, top_k).await?;

        if retrieval.is_empty() {
            tracing::info!("No relevant context found for question");
            return Ok(Answer::no_relevant_context());
        }

        self.generator.generate(question, &retrieval).await
    }

    /// Write the index to disk. In-memory pipelines have nothing to write.
    pub fn persist(&self) -> AppResult<()> {
        if self.index.path().is_none() {
            tracing::debug!("In-memory index, nothing to persist");
            return Ok(());
        }
        self.index.persist()
    }

    /// Persist and release the pipeline.
    pub fn close(self) -> AppResult<()> {
        self.persist()
    }

    pub fn stats(&self) -> AppResult<IndexStats> {
        self.index.stats(&self.config.collection)
    }
}
