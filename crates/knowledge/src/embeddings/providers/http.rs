//! HTTP embedding service client.
//!
//! Request: `POST {"text": "..."}`. Response: `{"embedding": [...]}` or
//! `{"embeddings": [[...], ...]}` (first element used).

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use curator_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

impl EmbeddingResponse {
    fn into_vector(self) -> Option<Vec<f32>> {
        self.embedding
            .or_else(|| self.embeddings.and_then(|batch| batch.into_iter().next()))
            .filter(|v| !v.is_empty())
    }
}

/// Embedding provider backed by an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpEmbeddingProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), timeout_ms = timeout.as_millis() as u64))]
    async fn embed(&self, text: &str, timeout: Duration) -> AppResult<Vec<f32>> {
        debug!("Sending embedding request to {}", self.url);

        let exchange = async {
            let response = self
                .client
                .post(&self.url)
                .json(&EmbeddingRequest { text })
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| {
                    let reason = if e.is_timeout() { "timeout" } else { "unreachable" };
                    AppError::DependencyOffline(format!("embed {}: {}", reason, e))
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::DependencyOffline(format!(
                    "embed returned http_{}",
                    status.as_u16()
                )));
            }

            let body: EmbeddingResponse = response.json().await.map_err(|e| {
                AppError::DependencyOffline(format!("Failed to parse embed response: {}", e))
            })?;

            body.into_vector()
                .ok_or_else(|| AppError::DependencyOffline("embed returned no vector".to_string()))
        };

        let embedding = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| AppError::DependencyOffline("embed timeout".to_string()))??;

        debug!("Received {} dimensional embedding", embedding.len());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        let single: EmbeddingResponse = serde_json::from_str(r#"{"embedding": [0.1, 0.2]}"#).unwrap();
        assert_eq!(single.into_vector(), Some(vec![0.1, 0.2]));

        let batch: EmbeddingResponse =
            serde_json::from_str(r#"{"embeddings": [[0.3], [0.4]]}"#).unwrap();
        assert_eq!(batch.into_vector(), Some(vec![0.3]));

        let empty: EmbeddingResponse = serde_json::from_str(r#"{"embedding": []}"#).unwrap();
        assert_eq!(empty.into_vector(), None);

        let neither: EmbeddingResponse = serde_json::from_str(r#"{"vector": [1.0]}"#).unwrap();
        assert_eq!(neither.into_vector(), None);
    }

    #[tokio::test]
    async fn test_unreachable_is_offline() {
        // Port 9 (discard) is essentially never listening on localhost
        let provider = HttpEmbeddingProvider::new("http://127.0.0.1:9/embed");
        let err = provider
            .embed("hola", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(err.is_dependency_offline());
    }
}
