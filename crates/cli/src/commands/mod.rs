//! Command handlers for the Curator CLI.
//!
//! Every command builds the same query engine from configuration; they
//! differ only in what they ask of it and how they print the result.

pub mod ask;
pub mod health;
pub mod open;
pub mod stats;
pub mod timeline;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use health::HealthCommand;
pub use open::OpenCommand;
pub use stats::StatsCommand;
pub use timeline::TimelineCommand;

use anyhow::{bail, Context};
use curator_core::config::AppConfig;
use curator_knowledge::{create_provider, CorpusStore, JsonFileSource, QueryEngine, Reply};
use curator_llm::create_client;
use curator_prompt::PromptLibrary;
use serde_json::Value;
use std::sync::Arc;

/// Build the engine, loading the corpus when one is configured.
pub async fn load_engine(config: &AppConfig, require_corpus: bool) -> anyhow::Result<QueryEngine> {
    let corpus = Arc::new(CorpusStore::new());
    match &config.corpus.path {
        Some(path) => {
            corpus
                .reload(&JsonFileSource::new(path))
                .await
                .with_context(|| format!("Failed to load corpus {:?}", path))?;
        }
        None if require_corpus => {
            bail!("No corpus configured. Pass --corpus <file> or set corpus.path in the config file")
        }
        None => tracing::debug!("No corpus configured"),
    }

    let embedder = create_provider(&config.embed.url).context("Invalid embedding service URL")?;

    let llm = if config.llm.enabled {
        let client = create_client(&config.llm.provider, &config.llm.url, &config.llm.model)
            .context("Failed to create generation client")?;
        Some(client)
    } else {
        None
    };

    let prompts = PromptLibrary::load(config.prompts.dir.as_deref())
        .context("Failed to load prompt overrides")?;

    Ok(QueryEngine::new(config.clone(), corpus, embedder, llm, prompts))
}

/// Print a query reply. Non-success replies become errors after printing.
pub fn print_reply(reply: &Reply, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&reply.body)?);
    } else if reply.status == 200 {
        println!("{}", render_outcome(&reply.body));
    }

    if reply.status != 200 {
        let message = reply.body["message"].as_str().unwrap_or("request failed");
        bail!("{} ({})", message, reply.status);
    }
    Ok(())
}

fn render_outcome(body: &Value) -> String {
    let text = |key: &str| body[key].as_str().unwrap_or_default().to_string();

    match body["kind"].as_str() {
        Some("direct_answer") => {
            let mut out = text("answer");
            for action in body["meta"]["actions"].as_array().into_iter().flatten() {
                out.push_str(&format!(
                    "\n\n[{}] curator open {} --summarize",
                    action["label"].as_str().unwrap_or_default(),
                    action["id"]
                ));
            }
            out
        }
        Some("multi_choice") => {
            let mut out = text("message");
            for option in body["options"].as_array().into_iter().flatten() {
                let date = option["date"]
                    .as_str()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "\n  [{}] {}{}\n      {}",
                    option["id"],
                    option["title"].as_str().unwrap_or_default(),
                    date,
                    option["preview"].as_str().unwrap_or_default()
                ));
            }
            out
        }
        _ => text("message"),
    }
}
