//! Token-window chunking with configurable size and overlap.
//!
//! Tokens are Unicode word-boundary segments that are not pure whitespace,
//! so punctuation counts as a token and runs of spaces or newlines do not.
//! Each page is windowed on its own, which keeps a chunk's page attribution
//! exact. A chunk's text is the original page text between its first and
//! last token, whitespace and line breaks included.

use crate::types::{Chunk, Document, Page};
use policyqa_core::{AppError, AppResult};
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// Byte ranges of the tokens in `text`, in order.
pub fn tokenize(text: &str) -> Vec<Range<usize>> {
    text.split_word_bound_indices()
        .filter(|(_, segment)| !segment.trim().is_empty())
        .map(|(start, segment)| start..start + segment.len())
        .collect()
}

/// Number of tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    text.split_word_bounds()
        .filter(|segment| !segment.trim().is_empty())
        .count()
}

/// Splits documents into overlapping token windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. Requires `chunk_size >= 1` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk size must be at least 1".to_string()));
        }
        if overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily chunk a document.
    ///
    /// A document with no id, or with no text, yields nothing.
    pub fn chunks<'a>(&self, document: &'a Document) -> ChunkIter<'a> {
        ChunkIter {
            document,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            page_idx: 0,
            current: None,
        }
    }

    /// Chunk every document, in order.
    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunks(doc)).collect()
    }
}

/// Tokenized state of the page being windowed.
#[derive(Debug, Clone)]
struct PageCursor {
    tokens: Vec<Range<usize>>,
    start: usize,
    chunk_index: u32,
}

/// Iterator over the chunks of one document.
///
/// Cloning the iterator snapshots its position, so the remaining chunks can
/// be walked more than once.
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    document: &'a Document,
    chunk_size: usize,
    overlap: usize,
    page_idx: usize,
    current: Option<PageCursor>,
}

impl<'a> ChunkIter<'a> {
    fn page(&self) -> Option<&'a Page> {
        self.document.pages.get(self.page_idx)
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.document.id.trim().is_empty() {
            return None;
        }

        loop {
            let page = self.page()?;

            // Page 0 is not a real page number
            if page.number == 0 {
                self.page_idx += 1;
                continue;
            }

            let cursor = self.current.get_or_insert_with(|| PageCursor {
                tokens: tokenize(&page.text),
                start: 0,
                chunk_index: 0,
            });

            let total = cursor.tokens.len();
            if cursor.start >= total {
                self.page_idx += 1;
                self.current = None;
                continue;
            }

            let start = cursor.start;
            let end = (start + self.chunk_size).min(total);
            let text = &page.text[cursor.tokens[start].start..cursor.tokens[end - 1].end];
            let chunk_index = cursor.chunk_index;

            cursor.start = if end == total { total } else { end - self.overlap };
            cursor.chunk_index += 1;

            return Some(Chunk {
                id: Chunk::make_id(&self.document.id, page.number, chunk_index),
                text: text.to_string(),
                document: self.document.id.clone(),
                path: self
                    .document
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string()),
                page: page.number,
                chunk_index,
                token_offset: start as u32,
                token_count: (end - start) as u32,
            });
        }
    }
}
