//! llama.cpp server provider.
//!
//! Posts `{prompt, temperature, n_predict}` straight to the configured URL,
//! typically `http://host:port/completion`.

use super::post_completion;
use crate::client::{LlmClient, LlmRequest, LlmResponse};
use curator_core::AppResult;
use serde::Serialize;

/// llama.cpp API request format.
#[derive(Debug, Serialize)]
struct LlamaCppRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n_predict: Option<u32>,
}

/// llama.cpp completion client.
pub struct LlamaCppClient {
    /// Full completion URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl LlamaCppClient {
    /// Default URL: http://127.0.0.1:8081/completion
    pub fn new() -> Self {
        Self::with_url("http://127.0.0.1:8081/completion")
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_llama_request(&self, request: &LlmRequest) -> LlamaCppRequest {
        LlamaCppRequest {
            prompt: request.prompt.clone(),
            temperature: request.temperature,
            n_predict: request.max_tokens,
        }
    }
}

impl Default for LlamaCppClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for LlamaCppClient {
    fn provider_name(&self) -> &str {
        "llama-cpp"
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    #[tracing::instrument(skip(self, request), fields(prompt_chars = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to llama.cpp at {}", self.url);

        let body = self.to_llama_request(request);
        let response =
            post_completion(&self.client, "llama-cpp", &self.url, &body, request.timeout).await?;

        tracing::debug!(
            "Received completion from llama.cpp via {} in {}ms",
            response.shape,
            response.elapsed_ms
        );
        Ok(response)
    }
}
