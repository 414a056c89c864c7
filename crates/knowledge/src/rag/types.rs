//! Inbound query contract and response envelope.

use crate::answer::ChoiceOption;
use crate::deadline::{BudgetReport, StageRecord};
use crate::types::RankingDebug;
use curator_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw inbound request: `{question}`, `{forceId}` or `{action, payload}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundQuery {
    #[serde(default, alias = "pregunta")]
    pub question: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
}

/// An action is either a bare name or an object naming it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionSpec {
    Name(String),
    Object(ActionObject),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Number or numeric string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_prompt: Option<String>,
}

/// Validated form of [`InboundQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub question: String,
    pub force_id: Option<i64>,
    /// Lowercased action name
    pub action: Option<String>,
    pub action_prompt: Option<String>,
}

fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl InboundQuery {
    pub fn question(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn open(id: i64) -> Self {
        Self {
            force_id: Some(id),
            ..Default::default()
        }
    }

    pub fn summarize(id: i64, action_prompt: Option<String>) -> Self {
        Self {
            force_id: Some(id),
            action: Some(ActionSpec::Name("summarize".to_string())),
            payload: Some(ActionPayload { action_prompt }),
            ..Default::default()
        }
    }

    /// Normalize the request. Fails when there is neither question text nor a document id.
    pub fn resolve(&self) -> AppResult<ResolvedQuery> {
        let question = self.question.trim().to_string();
        let mut force_id = self.force_id.filter(|id| *id != 0);
        let mut payload = self.payload.clone();

        let action = match &self.action {
            Some(ActionSpec::Name(name)) => Some(name.trim().to_lowercase()),
            Some(ActionSpec::Object(obj)) => {
                if force_id.is_none() {
                    force_id = obj.id.as_ref().and_then(id_from_value).filter(|id| *id != 0);
                }
                if payload.is_none() {
                    payload = obj.payload.clone();
                }
                obj.action
                    .as_ref()
                    .or(obj.name.as_ref())
                    .or(obj.kind.as_ref())
                    .map(|a| a.trim().to_lowercase())
            }
            None => None,
        }
        .filter(|a| !a.is_empty());

        if question.is_empty() && force_id.is_none() {
            return Err(AppError::InvalidRequest("Missing 'question' field.".to_string()));
        }

        let action_prompt = payload
            .and_then(|p| p.action_prompt)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(ResolvedQuery {
            question,
            force_id,
            action,
            action_prompt,
        })
    }
}

/// The four terminal shapes of a query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    DirectAnswer { answer: String, document_id: i64 },
    MultiChoice { message: String, options: Vec<ChoiceOption> },
    RefinePrompt { message: String },
    NoResultsTip { message: String },
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::DirectAnswer { .. } => "direct_answer",
            Outcome::MultiChoice { .. } => "multi_choice",
            Outcome::RefinePrompt { .. } => "refine_prompt",
            Outcome::NoResultsTip { .. } => "no_results_tip",
        }
    }

    /// Main user-facing text.
    pub fn text(&self) -> &str {
        match self {
            Outcome::DirectAnswer { answer, .. } => answer,
            Outcome::MultiChoice { message, .. }
            | Outcome::RefinePrompt { message }
            | Outcome::NoResultsTip { message } => message,
        }
    }
}

/// Follow-up the caller may offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    pub label: String,
}

impl SuggestedAction {
    pub fn summarize(id: i64) -> Self {
        Self {
            kind: "summarize".to_string(),
            id,
            label: "Summarize".to_string(),
        }
    }
}

/// What the final generation step did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmMeta {
    pub enabled: bool,
    pub used: bool,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_mode: Option<String>,
    pub prompt_chars: usize,
}

/// Diagnostic envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub generation: u64,
    pub budget: BudgetReport,
    pub stages: Vec<StageRecord>,
    pub fired: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
    pub llm: LlmMeta,
    pub ranking: Vec<RankingDebug>,
    pub actions: Vec<SuggestedAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub question: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub meta: ResponseMeta,
}

/// Transport-neutral reply: status code plus JSON body.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

/// Result of a health probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub embed_ok: bool,
    pub embed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub documents: usize,
    pub vectorized: usize,
    pub generation: u64,
    pub llm_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_url: Option<String>,
}
