//! Test doubles shared across the crate's tests.

use crate::types::{Chunk, ScoredChunk};
use policyqa_core::{AppError, AppResult};
use policyqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::Mutex;

/// Chat client that returns a canned reply and records every request.
pub struct StubLlm {
    reply: Mutex<Option<AppResult<String>>>,
    fixed: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl StubLlm {
    /// Always reply with `text`.
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Mutex::new(None),
            fixed: Some(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first call with `err`.
    pub fn failing(err: AppError) -> Self {
        Self {
            reply: Mutex::new(Some(Err(err))),
            fixed: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn next_reply(&self) -> AppResult<String> {
        if let Some(reply) = self.reply.lock().unwrap().take() {
            return reply;
        }
        self.fixed
            .clone()
            .ok_or_else(|| AppError::Other("no reply scripted".to_string()))
    }
}

#[async_trait::async_trait]
impl LlmClient for StubLlm {
    fn provider_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self.next_reply()?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
            truncated: false,
        })
    }
}

/// A retrieved chunk on `page` of `document`.
pub fn hit(document: &str, page: u32, text: &str) -> ScoredChunk {
    ScoredChunk {
        chunk: Chunk {
            id: Chunk::make_id(document, page, 0),
            text: text.to_string(),
            document: document.to_string(),
            path: None,
            page,
            chunk_index: 0,
            token_offset: 0,
            token_count: crate::chunker::count_tokens(text) as u32,
        },
        score: 0.8,
    }
}
