//! Timeline command handler.

use super::load_engine;
use clap::Args;
use curator_core::config::AppConfig;

/// List documents in date order
#[derive(Args, Debug)]
pub struct TimelineCommand {
    /// Show at most this many entries
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TimelineCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing timeline command");

        let engine = load_engine(config, true).await?;
        let mut entries = engine.timeline();
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        for entry in &entries {
            let date = entry
                .date
                .map(|d| d.format("%d-%m-%Y").to_string())
                .unwrap_or_else(|| "undated".to_string());
            println!("{:<10}  {}", date, entry.title);
        }
        Ok(())
    }
}
