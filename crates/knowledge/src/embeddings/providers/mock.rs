//! Mock embedding provider using trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use crate::text::{normalize, split_words};
use curator_core::AppResult;
use std::collections::HashMap;
use std::time::Duration;

/// Offline provider for tests, demos and corpus seeding.
///
/// Generates deterministic embeddings from character trigrams and word
/// frequencies of the normalized text. Not semantically accurate, but
/// consistent and content-dependent: texts sharing words land close together.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
    endpoint: String,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            endpoint: format!("mock://{}", dimensions.max(1)),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Unit vector for `text`.
    ///
    /// Text without any word of three or more characters maps to a single
    /// axis picked from its normalized words, so it never yields a zero vector.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let normalized = normalize(text);

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in split_words(&normalized).filter(|w| w.chars().count() > 2) {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let hash = window
                    .iter()
                    .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
                embedding[(hash as usize) % self.dimensions] += (*freq as f32).sqrt();
            }

            embedding[(byte_hash(word) as usize) % self.dimensions] += *freq as f32;
        }

        if word_freq.is_empty() {
            let key = split_words(&normalized).collect::<Vec<_>>().join(" ");
            embedding[(byte_hash(&key) as usize) % self.dimensions] = 1.0;
            return embedding;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        embedding
    }
}

fn byte_hash(text: &str) -> u64 {
    text.bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn embed(&self, text: &str, _timeout: Duration) -> AppResult<Vec<f32>> {
        Ok(self.vector_for(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::cosine_similarity;

    const T: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_mock_provider_embed_single() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("hola mundo", T).await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockProvider::new(384);
        let a = provider.embed("prueba determinista", T).await.unwrap();
        let b = provider.embed("prueba determinista", T).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_provider_ignores_diacritics() {
        let provider = MockProvider::new(384);
        let a = provider.embed("Fundación", T).await.unwrap();
        let b = provider.embed("fundacion", T).await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let provider = MockProvider::new(384);
        let query = provider.vector_for("estación de tren");
        let related = provider.vector_for("La estación de tren se inauguró");
        let unrelated = provider.vector_for("Campeonato de bochas");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_mock_provider_short_words_still_embed() {
        let provider = MockProvider::new(384);
        for text in ["", "de la", "¿y?", "N° 12"] {
            let embedding = provider.embed(text, T).await.unwrap();
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.001, "{:?}", text);
        }
        assert_eq!(provider.vector_for("de la"), provider.vector_for("De  la "));
        assert_ne!(provider.vector_for("de"), provider.vector_for("la"));
    }
}
