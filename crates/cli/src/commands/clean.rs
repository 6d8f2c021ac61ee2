//! Clean command handler.

use clap::Args;
use policyqa_core::{config::AppConfig, AppResult};

/// Delete the collection's index and settings
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command for '{}'", config.collection);

        policyqa_knowledge::clean(config)?;

        println!("Collection '{}' cleaned", config.collection);
        Ok(())
    }
}
