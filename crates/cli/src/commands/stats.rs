//! Stats command handler.
//!
//! Shows corpus statistics.

use super::load_engine;
use clap::Args;
use curator_core::config::AppConfig;

/// Show corpus statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing stats command");

        let engine = load_engine(config, true).await?;
        let stats = engine.stats();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Documents:  {}", stats.documents);
            println!("Vectorized: {}", stats.vectorized);
            println!("Generation: {}", stats.generation);
            println!("Loaded at:  {}", stats.loaded_at.to_rfc3339());
        }

        Ok(())
    }
}
