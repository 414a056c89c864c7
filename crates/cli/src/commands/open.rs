//! Open command handler.
//!
//! Opens a document by id, or summarizes it with `--summarize`.

use super::{load_engine, print_reply};
use clap::Args;
use curator_core::config::AppConfig;
use curator_knowledge::InboundQuery;

/// Open a document by id
#[derive(Args, Debug)]
pub struct OpenCommand {
    /// Document id
    pub id: i64,

    /// Summarize the document instead of showing the answer card
    #[arg(short, long)]
    pub summarize: bool,

    /// Custom instruction for the summary (implies --summarize)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Print the full response envelope as JSON
    #[arg(long)]
    pub json: bool,
}

impl OpenCommand {
    pub fn to_query(&self) -> InboundQuery {
        if self.summarize || self.prompt.is_some() {
            InboundQuery::summarize(self.id, self.prompt.clone())
        } else {
            InboundQuery::open(self.id)
        }
    }

    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing open command for document #{}", self.id);

        let engine = load_engine(config, true).await?;
        let reply = engine.respond(&self.to_query()).await;
        print_reply(&reply, self.json)
    }
}
