//! Completion provider implementations.

pub mod llama_cpp;
pub mod ollama;

pub use llama_cpp::LlamaCppClient;
pub use ollama::OllamaClient;

use crate::client::LlmResponse;
use crate::extract::extract_text;
use curator_core::{AppError, AppResult};
use serde::Serialize;
use std::time::{Duration, Instant};

/// POST a JSON body and pull generated text out of whatever shape comes back.
pub(crate) async fn post_completion<B: Serialize + ?Sized>(
    http: &reqwest::Client,
    provider: &str,
    url: &str,
    body: &B,
    timeout: Option<Duration>,
) -> AppResult<LlmResponse> {
    let started = Instant::now();

    let mut builder = http.post(url).json(body);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let response = builder.send().await.map_err(|e| {
        let reason = if e.is_timeout() { "timeout" } else { "request failed" };
        AppError::GenerationUnavailable(format!("{} {}: {}", provider, reason, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::GenerationUnavailable(format!(
            "{} returned http_{}",
            provider,
            status.as_u16()
        )));
    }

    let reply: serde_json::Value = response.json().await.map_err(|e| {
        AppError::GenerationUnavailable(format!("Failed to parse {} response: {}", provider, e))
    })?;

    let (shape, content) = extract_text(&reply).ok_or_else(|| {
        AppError::GenerationUnavailable(format!("{} returned no usable text", provider))
    })?;

    let model = reply
        .get("model")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(LlmResponse {
        content,
        model,
        shape: shape.name().to_string(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}
