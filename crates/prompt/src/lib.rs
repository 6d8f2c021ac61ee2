//! Prompt composition for PolicyQA.
//!
//! This crate turns a user question and the retriever's ranked excerpts
//! into a grounded prompt:
//! - Fixed instruction preamble (answer only from excerpts, cite sources)
//! - Handlebars template rendering of labelled excerpts and the question

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::{PromptComposer, DEFAULT_PREAMBLE, DEFAULT_TEMPLATE};
pub use types::{ComposedPrompt, Excerpt};
