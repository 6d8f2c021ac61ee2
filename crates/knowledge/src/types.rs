//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One page of extracted document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub number: u32,

    /// Raw extracted text
    pub text: String,
}

/// A source document: an identifier plus its ordered pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier (file name)
    pub id: String,

    /// Path the document was loaded from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Pages in reading order
    pub pages: Vec<Page>,
}

impl Document {
    /// Create an empty document.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
            pages: Vec::new(),
        }
    }

    /// Create a document from page texts numbered from 1.
    pub fn from_pages<I, S>(id: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: i as u32 + 1,
                text: text.into(),
            })
            .collect();

        Self {
            id: id.into(),
            path: None,
            pages,
        }
    }

    /// Attach the path the document was loaded from.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Total bytes of page text.
    pub fn text_len(&self) -> usize {
        self.pages.iter().map(|p| p.text.len()).sum()
    }
}

/// A bounded segment of document text with its source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Entry identifier: `{document}:p{page}:c{chunk_index}`
    pub id: String,

    /// Chunk text, an exact slice of the page text
    pub text: String,

    /// Source document identifier
    pub document: String,

    /// Source document path, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// 1-based page the chunk is drawn from
    pub page: u32,

    /// Position of the chunk within its page
    pub chunk_index: u32,

    /// Index of the chunk's first token within its page
    pub token_offset: u32,

    /// Number of tokens in the chunk
    pub token_count: u32,
}

impl Chunk {
    /// Build the entry identifier for a chunk.
    pub fn make_id(document: &str, page: u32, chunk_index: u32) -> String {
        format!("{}:p{}:c{}", document, page, chunk_index)
    }
}

/// A chunk paired with its embedding vector, as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    /// Create an entry from a chunk and its embedding.
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }

    /// Entry identifier, unique within an index.
    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,

    /// Cosine similarity in [-1.0, 1.0]
    pub score: f32,
}

/// Chunks ordered by descending similarity, at most Top-K long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Create a result from hits already in relevance order.
    pub fn new(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    /// An empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredChunk> {
        self.hits.iter()
    }

    /// Highest similarity score, if any.
    pub fn top_score(&self) -> Option<f32> {
        self.hits.first().map(|h| h.score)
    }
}

/// A reference from an answer back to a source document page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source document identifier
    pub document: String,

    /// 1-based page number
    pub page: u32,

    /// Entry identifier of the chunk backing the citation
    pub chunk_id: String,
}

/// How an answer's citations were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationMode {
    /// Parsed from citation markers in the model output
    Explicit,
    /// No markers found; every chunk in the prompt is listed
    SourcesConsulted,
    /// No context was retrieved, so nothing is cited
    None,
}

/// Generated answer with citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text
    pub text: String,

    /// Citations in first-mention order, deduplicated by document and page
    pub citations: Vec<Citation>,

    /// How `citations` were obtained
    pub citation_mode: CitationMode,

    /// Whether retrieved context backed the answer
    pub grounded: bool,

    /// Chunks that were placed in the prompt, in relevance order
    pub retrieved: Vec<ScoredChunk>,
}

/// Answer text used when retrieval finds nothing.
pub const NO_RELEVANT_CONTEXT: &str = "No relevant context found in the indexed documents.";

impl Answer {
    /// Answer reported when retrieval returns zero results.
    /// The generator is never invoked for it.
    pub fn no_relevant_context() -> Self {
        Self {
            text: NO_RELEVANT_CONTEXT.to_string(),
            citations: Vec::new(),
            citation_mode: CitationMode::None,
            grounded: false,
            retrieved: Vec::new(),
        }
    }
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of documents processed
    pub documents: u32,

    /// Number of non-empty pages processed
    pub pages: u32,

    /// Number of chunks embedded and inserted
    pub chunks: u32,

    /// Total bytes of page text processed
    pub bytes_processed: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Collection name
    pub collection: String,

    /// Number of index entries
    pub entries: u32,

    /// Number of distinct source documents
    pub documents: u32,

    /// Vector dimension
    pub dimension: usize,

    /// Embedding model the vectors came from
    pub embedding_model: String,

    /// Size of the persisted index file in bytes
    pub db_size_bytes: u64,

    /// Last time the index was persisted
    pub updated_at: Option<DateTime<Utc>>,
}
