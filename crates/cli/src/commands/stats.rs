//! Stats command handler.

use clap::Args;
use policyqa_core::{config::AppConfig, AppResult};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for '{}'", config.collection);

        let stats = policyqa_knowledge::stats(config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("Collection: {}", stats.collection);
        println!("Documents: {}", stats.documents);
        println!("Chunks: {}", stats.entries);
        println!(
            "Embeddings: {} ({} dims)",
            stats.embedding_model, stats.dimension
        );
        println!("Index size: {:.1} KB", stats.db_size_bytes as f64 / 1024.0);
        match stats.updated_at {
            Some(ts) => println!("Last updated: {}", ts.to_rfc3339()),
            None => println!("Last updated: never"),
        }

        Ok(())
    }
}
