//! Command handlers for the PolicyQA CLI.

pub mod ask;
pub mod clean;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use clean::CleanCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;
