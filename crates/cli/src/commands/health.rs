//! Health command handler.
//!
//! Probes the embedding service and reports corpus counts.

use super::load_engine;
use anyhow::bail;
use clap::Args;
use curator_core::config::AppConfig;

/// Probe the embedding service
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing health command");

        let engine = load_engine(config, false).await?;
        let report = engine.health().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            let status = if report.embed_ok { "ok" } else { "offline" };
            println!("Embeddings: {} ({})", status, report.embed_url);
            if let Some(error) = &report.error {
                println!("  {}", error);
            }
            match &report.llm_url {
                Some(url) if report.llm_enabled => println!("Generation: on ({})", url),
                _ => println!("Generation: off"),
            }
            println!(
                "Corpus:     {} documents, {} vectorized, generation {}",
                report.documents, report.vectorized, report.generation
            );
        }

        if !report.embed_ok {
            bail!("Embedding service is offline");
        }
        Ok(())
    }
}
