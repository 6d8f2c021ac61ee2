//! Ask command handler.

use clap::Args;
use policyqa_core::{config::AppConfig, AppResult};
use policyqa_knowledge::{Answer, CitationMode};
use std::path::PathBuf;

/// Ask a question about the indexed policies
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (1-20)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Ingest this folder first if the collection is empty
    #[arg(long)]
    pub docs: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Question: {}", self.question);
        config.validate_credentials()?;

        let docs = self.docs.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                config.workspace.join(dir)
            }
        });

        let answer =
            policyqa_knowledge::ask(config, &self.question, self.top_k, docs.as_deref()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }
}

fn print_answer(answer: &Answer) {
    println!("Answer:");
    println!("{}", answer.text);
    println!();

    match answer.citation_mode {
        CitationMode::None => println!("Sources: (no sources available)"),
        CitationMode::Explicit => println!("Sources:"),
        CitationMode::SourcesConsulted => println!("Sources consulted:"),
    }
    for citation in &answer.citations {
        println!(
            "- {} | page {} | {}",
            citation.document, citation.page, citation.chunk_id
        );
    }
}
