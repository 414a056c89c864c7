//! Ask command handler.
//!
//! Runs one question through the query engine.

use super::{load_engine, print_reply};
use anyhow::bail;
use clap::Args;
use curator_core::config::AppConfig;
use curator_knowledge::InboundQuery;

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question; multiple words are joined with spaces
    #[arg(required = true)]
    pub question: Vec<String>,

    /// Print the full response envelope as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub fn question_text(&self) -> String {
        self.question.join(" ").trim().to_string()
    }

    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question_text();
        if question.is_empty() {
            bail!("No question provided");
        }

        let engine = load_engine(config, true).await?;
        let reply = engine.respond(&InboundQuery::question(question)).await;
        print_reply(&reply, self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_words_are_joined() {
        let cmd = AskCommand {
            question: vec!["cuándo".to_string(), " se fundó ".to_string()],
            json: false,
        };
        assert_eq!(cmd.question_text(), "cuándo  se fundó");
    }
}
