//! Embedding provider trait and factory.

use super::providers::{HttpEmbeddingProvider, MockProvider};
use curator_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Default dimensions of the mock provider.
const MOCK_DIMENSIONS: usize = 384;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "http", "mock")
    fn provider_name(&self) -> &str;

    /// Where requests go; reported by health checks
    fn endpoint(&self) -> &str;

    /// Embed one query string within `timeout`.
    ///
    /// Any failure, including an empty vector, is `DependencyOffline`.
    async fn embed(&self, text: &str, timeout: Duration) -> AppResult<Vec<f32>>;
}

/// Create an embedding provider from the configured URL.
///
/// `mock` or `mock://<dims>` selects the offline trigram provider; anything
/// starting with `http://` or `https://` the HTTP provider.
pub fn create_provider(url: &str) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let url = url.trim();

    if url == "mock" {
        return Ok(Arc::new(MockProvider::new(MOCK_DIMENSIONS)));
    }

    if let Some(dims) = url.strip_prefix("mock://") {
        let dimensions = dims
            .parse::<usize>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| AppError::Config(format!("Invalid mock dimensions: '{}'", dims)))?;
        return Ok(Arc::new(MockProvider::new(dimensions)));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Arc::new(HttpEmbeddingProvider::new(url)));
    }

    Err(AppError::Config(format!(
        "Unsupported embedding URL: '{}'. Use http(s)://..., mock or mock://<dims>",
        url
    )))
}
