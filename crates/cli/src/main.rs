//! PolicyQA CLI
//!
//! Main entry point for the policyqa command-line tool.
//! Ingests policy documents and answers questions about them with citations.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CleanCommand, IngestCommand, StatsCommand};
use policyqa_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// PolicyQA - answer questions from your policy documents
#[derive(Parser, Debug)]
#[command(name = "policyqa")]
#[command(about = "Answer questions from policy documents with page citations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "POLICYQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "POLICYQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Chat provider (openai, ollama)
    #[arg(short, long, global = true, env = "POLICYQA_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "POLICYQA_MODEL")]
    model: Option<String>,

    /// Collection to ingest into and answer from
    #[arg(long, global = true, env = "POLICYQA_COLLECTION")]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, chunk and index a folder of policy documents
    Ingest(IngestCommand),

    /// Ask a question about the indexed policies
    Ask(AskCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Delete the collection's index and settings
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.collection,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("PolicyQA CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);
    tracing::debug!("Collection: {}", config.collection);

    config.validate()?;
    config.ensure_policyqa_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
        Commands::Clean(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
