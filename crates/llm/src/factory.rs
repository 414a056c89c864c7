//! Completion provider factory.

use crate::client::LlmClient;
use crate::providers::{LlamaCppClient, OllamaClient};
use crate::types::ProviderType;
use curator_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a completion client from configuration values.
///
/// # Arguments
/// * `provider` - Provider identifier ("llama-cpp", "ollama")
/// * `url` - Full completion URL for llama-cpp, base URL for Ollama
/// * `model` - Model name (ignored by llama-cpp)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the URL is blank.
pub fn create_client(provider: &str, url: &str, model: &str) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    if url.trim().is_empty() {
        return Err(AppError::Config(format!(
            "Provider {} requires a URL",
            provider_type
        )));
    }

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::LlamaCpp => Arc::new(LlamaCppClient::with_url(url)),
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(url, model)),
    };

    tracing::debug!("Created {} client for {}", provider_type, client.endpoint());
    Ok(client)
}
