//! Answer generation over retrieved policy excerpts.

pub mod citations;
pub mod generator;

pub use citations::extract_citations;
pub use generator::{AnswerGenerator, DEFAULT_TEMPERATURE};
