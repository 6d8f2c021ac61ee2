//! Ingest command handler.

use clap::Args;
use policyqa_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Load, chunk and index a folder of policy documents
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Folder of PDF, text or markdown documents
    #[arg(default_value = "Policy documents")]
    pub dir: PathBuf,

    /// Discard the existing index before ingesting
    #[arg(long)]
    pub rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.dir);
        config.validate_credentials()?;

        let dir = if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            config.workspace.join(&self.dir)
        };

        let stats = policyqa_knowledge::ingest(config, &dir, self.rebuild).await?;

        if self.json {
            let output = serde_json::json!({
                "collection": config.collection,
                "documents": stats.documents,
                "pages": stats.pages,
                "chunks": stats.chunks,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} documents ({} pages, {} chunks) into '{}' in {:.2}s",
                stats.documents, stats.pages, stats.chunks, config.collection, stats.duration_secs
            );
        }

        Ok(())
    }
}
