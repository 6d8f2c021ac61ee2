//! Error types for PolicyQA.
//!
//! This module defines a unified error enum shared by every crate in the
//! workspace. Service failures carry the pipeline [`Stage`] that produced
//! them so a caller can decide whether to retry.

use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Embedding,
    Retrieval,
    Generation,
    Persistence,
}

impl Stage {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Embedding => "embedding",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::Persistence => "persistence",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for PolicyQA.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic on external input; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network, timeout or rate-limit failure of an external service.
    /// Retryable by the caller.
    #[error("Transient service error during {stage}: {message}")]
    TransientService { stage: Stage, message: String },

    /// Caller-side malformed input. Not retryable without modification.
    #[error("Invalid input during {stage}: {message}")]
    InvalidInput { stage: Stage, message: String },

    /// The chat model call failed or returned unusable output
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// A persisted index failed to load or validate
    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    /// Missing collection, document, or file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Shorthand for a transient failure at `stage`.
    pub fn transient(stage: Stage, message: impl Into<String>) -> Self {
        AppError::TransientService {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for an invalid-input failure at `stage`.
    pub fn invalid_input(stage: Stage, message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            stage,
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransientService { .. })
    }

    /// The pipeline stage recorded on the error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::TransientService { stage, .. } | AppError::InvalidInput { stage, .. } => {
                Some(*stage)
            }
            AppError::GenerationFailed(_) => Some(Stage::Generation),
            AppError::IndexCorruption(_) => Some(Stage::Persistence),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
