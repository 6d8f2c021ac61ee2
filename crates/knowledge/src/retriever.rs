//! Query embedding and nearest-neighbour retrieval.

use crate::config::validate_top_k;
use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::types::RetrievalResult;
use policyqa_core::{AppError, AppResult, Stage};
use std::sync::Arc;

/// Embeds questions and pulls the closest chunks from the index.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Arc<Embedder>,
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever. Fails if `top_k` is out of range.
    pub fn new(embedder: Arc<Embedder>, index: Arc<VectorIndex>, top_k: usize) -> AppResult<Self> {
        validate_top_k(top_k)?;
        Ok(Self {
            embedder,
            index,
            top_k,
        })
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve with the configured Top-K.
    pub async fn retrieve(&self, question: &str) -> AppResult<RetrievalResult> {
        self.retrieve_top_k(question, self.top_k).await
    }

    /// Retrieve the `top_k` chunks most similar to `question`.
    pub async fn retrieve_top_k(&self, question: &str, top_k: usize) -> AppResult<RetrievalResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::invalid_input(
                Stage::Retrieval,
                "Question must not be empty",
            ));
        }
        validate_top_k(top_k)?;

        let vector = self.embedder.embed_query(question).await?;
        let result = self.index.query(&vector, top_k)?;

        tracing::info!(
            "Retrieved {} chunks for question (top-k {}, best score {:.3})",
            result.len(),
            top_k,
            result.top_score().unwrap_or(0.0)
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::{Chunk, IndexEntry};

    async fn setup() -> Retriever {
        let embedder = Arc::new(Embedder::new(Arc::new(TrigramProvider::new(256))));
        let index = Arc::new(VectorIndex::in_memory(256, "trigram-v1"));

        let texts = [
            ("leave.pdf", "Employees receive twenty days of annual leave per year."),
            ("travel.pdf", "Travel bookings must be made through the corporate portal."),
            ("expenses.pdf", "Expense claims require itemised receipts within thirty days."),
        ];
        let owned: Vec<String> = texts.iter().map(|(_, t)| t.to_string()).collect();
        let vectors = embedder.embed_texts(&owned).await.unwrap();

        let entries = texts
            .iter()
            .zip(vectors)
            .map(|((doc, text), vector)| {
                IndexEntry::new(
                    Chunk {
                        id: Chunk::make_id(doc, 1, 0),
                        text: text.to_string(),
                        document: doc.to_string(),
                        path: None,
                        page: 1,
                        chunk_index: 0,
                        token_offset: 0,
                        token_count: 10,
                    },
                    vector,
                )
            })
            .collect();
        index.insert(entries).unwrap();

        Retriever::new(embedder, index, 5).unwrap()
    }

    #[tokio::test]
    async fn test_most_relevant_chunk_first() {
        let retriever = setup().await;
        let result = retriever
            .retrieve("How many days of annual leave do employees get?")
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.hits[0].chunk.document, "leave.pdf");
    }

    #[tokio::test]
    async fn test_top_k_limits_results() {
        let retriever = setup().await;
        let result = retriever.retrieve_top_k("receipts", 1).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.hits[0].chunk.document, "expenses.pdf");
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let retriever = setup().await;
        let err = retriever.retrieve("   ").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidInput {
                stage: Stage::Retrieval,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_top_k_rejected() {
        let retriever = setup().await;
        assert!(retriever.retrieve_top_k("leave", 0).await.is_err());
        assert!(retriever.retrieve_top_k("leave", 21).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let embedder = Arc::new(Embedder::new(Arc::new(TrigramProvider::new(64))));
        let index = Arc::new(VectorIndex::in_memory(64, "trigram-v1"));
        let retriever = Retriever::new(embedder, index, 5).unwrap();

        assert!(retriever.retrieve("leave").await.unwrap().is_empty());
    }
}
