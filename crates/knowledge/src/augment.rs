//! Best-effort text generation around the retrieval pipeline.
//!
//! Nothing in here returns an error: every failure is folded into the
//! outcome as "not used" so the caller can fall back to its deterministic
//! answer.

use crate::answer::{build_context, rerank_context};
use crate::summary::enforce_summary_lines;
use crate::text::collapse_whitespace;
use crate::types::{Document, Hit};
use curator_core::AppError;
use curator_llm::{LlmClient, LlmRequest};
use curator_prompt::builtin::{ANSWER_CUSTOM, ANSWER_SUMMARY, QUERY_REWRITE, RERANK_SCORE};
use curator_prompt::PromptLibrary;
use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Result of one generation attempt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOutcome {
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub prompt_chars: usize,
    pub prompt_id: String,
}

impl GenerationOutcome {
    fn failed(prompt_id: &str, error: impl Into<String>, prompt_chars: usize, elapsed: Duration) -> Self {
        Self {
            used: false,
            text: None,
            error: Some(error.into()),
            elapsed_ms: elapsed.as_millis() as u64,
            prompt_chars,
            prompt_id: prompt_id.to_string(),
        }
    }
}

/// Result of an LLM rerank pass.
#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub hits: Vec<Hit>,
    /// False when every scoring call failed and the order was kept
    pub used: bool,
    /// Per-candidate score, `None` for failed calls
    pub scores: Vec<(i64, Option<u32>)>,
}

fn score_regex() -> Option<&'static Regex> {
    static SCORE: OnceLock<Option<Regex>> = OnceLock::new();
    SCORE.get_or_init(|| Regex::new(r"^\s*(\d{1,3})\s*$").ok()).as_ref()
}

/// Bare integer reply clamped to 0..=100; anything else is `None`.
pub fn parse_score(reply: &str) -> Option<u32> {
    let caps = score_regex()?.captures(reply)?;
    caps.get(1)?.as_str().parse::<u32>().ok().map(|s| s.min(100))
}

/// Flatten a rewritten query to one line without quotes.
pub fn clean_rewritten_query(raw: &str) -> String {
    let unquoted: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
    collapse_whitespace(&unquoted)
}

/// Generation front-end used by the query engine.
#[derive(Clone)]
pub struct Augmenter {
    llm: Option<Arc<dyn LlmClient>>,
    prompts: Arc<PromptLibrary>,
    snippet_chars: usize,
    rerank_max: usize,
}

impl std::fmt::Debug for Augmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Augmenter")
            .field("llm", &self.llm.as_ref().map(|c| c.provider_name().to_string()))
            .field("snippet_chars", &self.snippet_chars)
            .field("rerank_max", &self.rerank_max)
            .finish()
    }
}

impl Augmenter {
    /// `llm` is `None` when generation is disabled.
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        prompts: Arc<PromptLibrary>,
        snippet_chars: usize,
        rerank_max: usize,
    ) -> Self {
        Self {
            llm,
            prompts,
            snippet_chars,
            rerank_max: rerank_max.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.llm.as_ref().map(|c| c.endpoint())
    }

    async fn generate(
        &self,
        prompt_id: &str,
        variables: HashMap<String, String>,
        timeout: Duration,
    ) -> GenerationOutcome {
        let started = Instant::now();
        let Some(llm) = self.llm.as_ref() else {
            return GenerationOutcome::failed(prompt_id, "disabled", 0, Duration::ZERO);
        };

        let built = match self.prompts.render(prompt_id, variables) {
            Ok(built) => built,
            Err(e) => {
                tracing::warn!("Prompt {} failed to render: {}", prompt_id, e);
                return GenerationOutcome::failed(prompt_id, "prompt", 0, started.elapsed());
            }
        };
        let prompt_chars = built.text.chars().count();

        let request = LlmRequest::new(built.text)
            .with_temperature(built.temperature)
            .with_max_tokens(built.max_tokens)
            .with_timeout(timeout);

        let result = match tokio::time::timeout(timeout, llm.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::GenerationUnavailable("timeout".to_string())),
        };

        match result {
            Ok(response) => GenerationOutcome {
                used: true,
                text: Some(response.content),
                error: None,
                elapsed_ms: started.elapsed().as_millis() as u64,
                prompt_chars,
                prompt_id: prompt_id.to_string(),
            },
            Err(e) => {
                tracing::warn!("Generation {} not used: {}", prompt_id, e);
                GenerationOutcome::failed(prompt_id, e.to_string(), prompt_chars, started.elapsed())
            }
        }
    }

    fn context_vars(&self, doc: &Document, question: &str) -> HashMap<String, String> {
        HashMap::from([
            ("context".to_string(), build_context(doc, question, self.snippet_chars)),
            ("question".to_string(), question.to_string()),
        ])
    }

    /// Rewrite the direct answer with the prompt for `mode`.
    pub async fn rewrite_answer(
        &self,
        doc: &Document,
        question: &str,
        mode: &str,
        timeout: Duration,
    ) -> GenerationOutcome {
        let prompt_id = self.prompts.answer_prompt_id(mode);
        let mut outcome = self
            .generate(&prompt_id, self.context_vars(doc, question), timeout)
            .await;

        if prompt_id == ANSWER_SUMMARY {
            normalize_summary(&mut outcome);
        }
        outcome
    }

    /// Three-to-five line summary, optionally driven by a caller instruction.
    pub async fn summarize(
        &self,
        doc: &Document,
        question: &str,
        action_prompt: Option<&str>,
        timeout: Duration,
    ) -> GenerationOutcome {
        let mut vars = self.context_vars(doc, question);
        let prompt_id = match action_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(instruction) => {
                vars.insert("action_prompt".to_string(), instruction.to_string());
                ANSWER_CUSTOM
            }
            None => ANSWER_SUMMARY,
        };

        let mut outcome = self.generate(prompt_id, vars, timeout).await;
        normalize_summary(&mut outcome);
        outcome
    }

    /// Ask for a better query. `used` only when the result is non-empty and differs from `original`.
    pub async fn rewrite_query(&self, original: &str, timeout: Duration) -> GenerationOutcome {
        let vars = HashMap::from([("original".to_string(), original.to_string())]);
        let mut outcome = self.generate(QUERY_REWRITE, vars, timeout).await;

        if let Some(raw) = outcome.text.take() {
            let cleaned = clean_rewritten_query(&raw);
            if cleaned.is_empty() {
                outcome.used = false;
                outcome.error = Some("empty".to_string());
            } else if cleaned == original.trim() {
                outcome.used = false;
                outcome.error = Some("unchanged".to_string());
            } else {
                outcome.text = Some(cleaned);
            }
        }
        outcome
    }

    /// Score up to `rerank_max` leading candidates concurrently and reorder them.
    pub async fn rerank(&self, query: &str, hits: Vec<Hit>, timeout: Duration) -> RerankOutcome {
        let limit = self.rerank_max.min(hits.len());

        let calls = hits[..limit].iter().map(|hit| {
            let vars = HashMap::from([
                ("query".to_string(), query.to_string()),
                ("text".to_string(), rerank_context(&hit.doc)),
            ]);
            async move {
                let outcome = self.generate(RERANK_SCORE, vars, timeout).await;
                outcome.text.as_deref().and_then(parse_score)
            }
        });
        let scores: Vec<Option<u32>> = join_all(calls).await;

        let report: Vec<(i64, Option<u32>)> =
            hits.iter().zip(&scores).map(|(h, s)| (h.id(), *s)).collect();

        if scores.iter().all(Option::is_none) {
            tracing::warn!("Rerank produced no scores; keeping order");
            return RerankOutcome {
                hits,
                used: false,
                scores: report,
            };
        }

        let mut rest = hits;
        let tail = rest.split_off(limit);
        let mut scored: Vec<(u32, Hit)> = rest
            .into_iter()
            .zip(&scores)
            .map(|(hit, score)| (score.unwrap_or(0), hit))
            .collect();
        // Stable: ties and failed calls keep their prior relative order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut ordered: Vec<Hit> = scored.into_iter().map(|(_, hit)| hit).collect();
        ordered.extend(tail);

        tracing::debug!("Rerank scores: {:?}", report);
        RerankOutcome {
            hits: ordered,
            used: true,
            scores: report,
        }
    }
}

fn normalize_summary(outcome: &mut GenerationOutcome) {
    if let Some(text) = outcome.text.take() {
        let shaped = enforce_summary_lines(&text);
        if shaped.is_empty() {
            outcome.used = false;
            outcome.error = Some("empty".to_string());
        } else {
            outcome.text = Some(shaped);
        }
    }
}
