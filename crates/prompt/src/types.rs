//! Prompt types for PolicyQA.

use serde::{Deserialize, Serialize};

/// One retrieved passage as it appears in a grounded prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    /// Citation label the model is asked to echo (e.g., "S1")
    pub label: String,

    /// Source document identifier (file name)
    pub document: String,

    /// 1-based page number within the document
    pub page: u32,

    /// Passage text
    pub text: String,
}

impl Excerpt {
    /// Create an excerpt labelled by its 1-based rank.
    pub fn ranked(rank: usize, document: impl Into<String>, page: u32, text: impl Into<String>) -> Self {
        Self {
            label: format!("S{}", rank),
            document: document.into(),
            page,
            text: text.into(),
        }
    }
}

/// A fully composed prompt ready for a chat model.
///
/// The preamble goes into the system message and everything else into the
/// user message, which is how chat APIs weight instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedPrompt {
    /// Fixed instruction preamble
    pub system: String,

    /// Labelled excerpts followed by the question
    pub user: String,

    /// Number of excerpts rendered into `user`
    pub excerpt_count: usize,
}

impl ComposedPrompt {
    /// Single-string form for completion APIs without a system role.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system.trim_end(), self.user)
    }

    /// Whether the prompt carries any retrieved context.
    pub fn has_context(&self) -> bool {
        self.excerpt_count > 0
    }
}
