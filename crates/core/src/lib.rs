//! PolicyQA Core Library
//!
//! This crate provides the foundational utilities shared by every PolicyQA crate:
//! - Error handling (`AppError`, `AppResult`, `Stage`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, Stage};
