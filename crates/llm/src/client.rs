//! Completion client abstraction and request/response types.

use curator_core::AppResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the backend
    pub prompt: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Per-call timeout; the whole HTTP exchange is aborted when it elapses
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl LlmRequest {
    /// Create a new request with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            timeout: None,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text, trimmed and never empty
    pub content: String,

    /// Model that generated the response, when the backend reports one
    pub model: String,

    /// Which response shape the text was found under
    pub shape: String,

    /// Wall time of the HTTP exchange
    pub elapsed_ms: u64,
}

/// Trait for completion providers.
///
/// Implementations report every failure (transport error, timeout,
/// non-success status, unparseable or empty output) as
/// `AppError::GenerationUnavailable`. Callers treat that as "not used".
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "llama-cpp", "ollama").
    fn provider_name(&self) -> &str;

    /// Endpoint the provider posts to.
    fn endpoint(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
