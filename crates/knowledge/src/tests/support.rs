//! Test doubles and fixtures shared by the scenario tests.

use crate::corpus::CorpusStore;
use crate::deadline::ManualClock;
use crate::embeddings::EmbeddingProvider;
use crate::rag::QueryEngine;
use crate::text::normalize;
use crate::types::Document;
use chrono::NaiveDate;
use curator_core::{AppConfig, AppError, AppResult};
use curator_llm::{LlmClient, LlmRequest, LlmResponse};
use curator_prompt::PromptLibrary;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIMS: usize = 5;

/// Unit vector along `axis`.
pub fn axis(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    v[axis] = 1.0;
    v
}

/// Unit vector whose cosine with `axis(primary)` is `cos`; the rest goes to `other`.
pub fn at_cosine(primary: usize, other: usize, cos: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    v[primary] = cos;
    v[other] = (1.0 - cos * cos).sqrt();
    v
}

/// Text no document is close to.
pub const UNKNOWN_AXIS: usize = DIMS - 1;

pub fn doc(id: i64, title: &str, content: &str, date: Option<&str>, vector: Vec<f32>) -> Document {
    Document {
        id,
        title: title.to_string(),
        content: content.to_string(),
        event_date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        image_url: String::new(),
        tags: String::new(),
        source_url: String::new(),
        vector: Some(vector),
    }
}

/// Article body of at least `min_chars` characters.
pub fn long_text(lead: &str, min_chars: usize) -> String {
    let mut text = lead.to_string();
    while text.chars().count() < min_chars {
        text.push_str(" The building was restored by neighbours and still stands on the main square.");
    }
    text
}

/// Embedder answering from a fixed table keyed by normalized text.
#[derive(Debug)]
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    offline: bool,
    clock: Option<(Arc<ManualClock>, Duration)>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            offline: false,
            clock: None,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(normalize(text), vector);
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Advance `clock` by `by` on every call.
    pub fn advancing(mut self, clock: Arc<ManualClock>, by: Duration) -> Self {
        self.clock = Some((clock, by));
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn provider_name(&self) -> &str {
        "stub"
    }

    fn endpoint(&self) -> &str {
        "stub://embed"
    }

    async fn embed(&self, text: &str, _timeout: Duration) -> AppResult<Vec<f32>> {
        if let Some((clock, by)) = &self.clock {
            clock.advance(*by);
        }
        if self.offline {
            return Err(AppError::DependencyOffline("connection refused".to_string()));
        }
        Ok(self
            .vectors
            .get(&normalize(text))
            .cloned()
            .unwrap_or_else(|| axis(UNKNOWN_AXIS)))
    }
}

type Script = dyn Fn(&str) -> AppResult<String> + Send + Sync;

/// Generation backend driven by a closure over the rendered prompt.
pub struct StubLlm {
    script: Box<Script>,
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn new(script: impl Fn(&str) -> AppResult<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Backend that fails every call.
    pub fn failing() -> Arc<Self> {
        Self::new(|_| Err(AppError::GenerationUnavailable("HTTP 500".to_string())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for StubLlm {
    fn provider_name(&self) -> &str {
        "stub"
    }

    fn endpoint(&self) -> &str {
        "stub://llm"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let content = (self.script)(&request.prompt)?;
        Ok(LlmResponse {
            content,
            model: "stub".to_string(),
            shape: "content".to_string(),
            elapsed_ms: 1,
        })
    }
}

pub fn is_rewrite_prompt(prompt: &str) -> bool {
    prompt.starts_with("You will improve a short query")
}

pub fn is_rerank_prompt(prompt: &str) -> bool {
    prompt.starts_with("You are a relevance judge")
}

pub fn is_summary_prompt(prompt: &str) -> bool {
    prompt.contains("Summarize the context in 3 to 5 lines")
}

/// Defaults with generation switched on or off.
pub fn config(llm_enabled: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.llm.enabled = llm_enabled;
    config
}

pub fn engine(
    config: AppConfig,
    documents: Vec<Document>,
    embedder: StubEmbedder,
    llm: Option<Arc<StubLlm>>,
) -> QueryEngine {
    QueryEngine::new(
        config,
        Arc::new(CorpusStore::from_documents(documents)),
        Arc::new(embedder),
        llm.map(|l| l as Arc<dyn LlmClient>),
        PromptLibrary::builtin(),
    )
}
