//! Curator CLI
//!
//! Main entry point for the curator command-line tool.
//! Answers questions over a curated document collection.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, HealthCommand, OpenCommand, StatsCommand, TimelineCommand};
use curator_core::{config::AppConfig, logging};
use std::path::PathBuf;
use tracing::Instrument;

/// Curator - question answering over a curated collection
#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(about = "Question answering over a curated document collection", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "CURATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus file (JSON array or JSON lines)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Switch text generation on or off
    #[arg(long, global = true, value_name = "on|off", value_parser = clap::builder::BoolishValueParser::new())]
    llm: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question
    Ask(AskCommand),

    /// Open a document by id, optionally summarized
    Open(OpenCommand),

    /// Show corpus statistics
    Stats(StatsCommand),

    /// List documents in date order
    Timeline(TimelineCommand),

    /// Probe the embedding service
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Open(_) => "open",
            Commands::Stats(_) => "stats",
            Commands::Timeline(_) => "timeline",
            Commands::Health(_) => "health",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(
            cli.corpus,
            cli.log_level,
            cli.verbose,
            cli.no_color,
            cli.log_json,
            cli.llm,
        );
    config.validate().context("Invalid configuration")?;

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Curator CLI starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Embedding service: {}", config.embed.url);
    tracing::debug!(
        "Generation: {} ({} at {})",
        if config.llm.enabled { "on" } else { "off" },
        config.llm.provider,
        config.llm.url
    );

    let span = tracing::info_span!("command", name = cli.command.name());

    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Open(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config).await,
            Commands::Timeline(cmd) => cmd.execute(&config).await,
            Commands::Health(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
