//! Candidate retrieval: cosine similarity plus tag and lexical bonuses.

use crate::corpus::CorpusSnapshot;
use crate::text::{best_tag_sim, query_tokens, token_overlap_count};
use crate::types::Hit;
use curator_core::config::SearchConfig;
use std::sync::Arc;

/// Scoring knobs for one retrieval pass.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub sim_threshold: f32,
    pub tag_match_bonus: f32,
    pub overlap_bonus_per_token: f32,
    pub overlap_bonus_max: f32,
    pub tag_bypass_sim: f32,
}

impl From<&SearchConfig> for RetrievalParams {
    fn from(search: &SearchConfig) -> Self {
        Self {
            top_k: search.top_k,
            sim_threshold: search.sim_threshold,
            tag_match_bonus: search.tag_match_bonus,
            overlap_bonus_per_token: search.overlap_bonus_per_token,
            overlap_bonus_max: search.overlap_bonus_max,
            tag_bypass_sim: search.tag_bypass_sim,
        }
    }
}

/// Cosine similarity over the common prefix; 0 when either norm is 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for i in 0..n {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }

    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

/// Descending by score; ties keep their current order.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Score every vectorized document against the query and keep the best `top_k`.
pub fn search_candidates(
    snapshot: &CorpusSnapshot,
    query_text: &str,
    query_vec: &[f32],
    params: &RetrievalParams,
) -> Vec<Hit> {
    let mut hits: Vec<Hit> = snapshot
        .vectorized()
        .filter_map(|doc| {
            let vector = doc.vector.as_deref()?;
            let cosine_sim = cosine_similarity(query_vec, vector);
            let tag_sim = best_tag_sim(query_text, &doc.tags);

            if cosine_sim < params.sim_threshold && tag_sim < params.tag_bypass_sim {
                return None;
            }

            let token_overlap = token_overlap_count(query_text, &doc.haystack());
            let overlap_bonus = (token_overlap as f32 * params.overlap_bonus_per_token)
                .min(params.overlap_bonus_max);
            let score = cosine_sim + params.tag_match_bonus * tag_sim + overlap_bonus;

            Some(Hit {
                doc: Arc::clone(doc),
                cosine_sim,
                tag_sim,
                token_overlap,
                score,
            })
        })
        .collect();

    sort_hits(&mut hits);
    hits.truncate(params.top_k);

    tracing::debug!(
        "Retrieved {} candidates for '{}' (threshold {:.2})",
        hits.len(),
        query_text,
        params.sim_threshold
    );
    hits
}

/// Require lexical overlap when the query has real terms, unless that empties the list.
pub fn lexical_gate(query_text: &str, hits: Vec<Hit>) -> Vec<Hit> {
    if query_tokens(query_text).is_empty() {
        return hits;
    }

    let overlapping: Vec<Hit> = hits.iter().filter(|h| h.token_overlap > 0).cloned().collect();
    if overlapping.is_empty() {
        tracing::debug!("Lexical gate would drop every candidate; keeping all");
        hits
    } else {
        overlapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn doc(id: i64, title: &str, tags: &str, vector: Vec<f32>) -> Document {
        Document {
            id,
            title: title.to_string(),
            content: String::new(),
            event_date: None,
            image_url: String::new(),
            tags: tags.to_string(),
            source_url: String::new(),
            vector: Some(vector),
        }
    }

    fn params() -> RetrievalParams {
        RetrievalParams::from(&SearchConfig::default())
    }

    #[test]
    fn test_cosine_properties() {
        let a = [1.0, 2.0, 3.0];
        let b = [-2.0, 0.5, 1.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &a), 0.0);
        let opposite = cosine_similarity(&a, &[-1.0, -2.0, -3.0]);
        assert!((-1.0..=-0.999).contains(&opposite));
    }

    #[test]
    fn test_cosine_uses_common_prefix() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 5.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_and_tag_bypass() {
        let snapshot = CorpusSnapshot::new(
            vec![
                doc(1, "close", "", vec![1.0, 0.0]),
                doc(2, "far", "", vec![0.0, 1.0]),
                doc(3, "far but tagged", "escuelas", vec![0.0, 1.0]),
            ],
            1,
        );

        let hits = search_candidates(&snapshot, "escuela", &[1.0, 0.0], &params());
        let ids: Vec<i64> = hits.iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(hits[1].tag_sim, 1.0);
        assert!((hits[1].score - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_top_k_truncation() {
        let docs = (0..10)
            .map(|i| doc(i, "x", "", vec![1.0, i as f32 * 0.01]))
            .collect();
        let snapshot = CorpusSnapshot::new(docs, 1);
        let hits = search_candidates(&snapshot, "x", &[1.0, 0.0], &params());
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].id(), 0);
    }

    #[test]
    fn test_unvectorized_documents_are_skipped() {
        let mut bare = doc(1, "bare", "", vec![]);
        bare.vector = None;
        let snapshot = CorpusSnapshot::new(vec![bare], 1);
        assert!(search_candidates(&snapshot, "bare", &[1.0], &params()).is_empty());
    }

    #[test]
    fn test_lexical_gate_fails_open() {
        let snapshot = CorpusSnapshot::new(
            vec![
                doc(1, "Plaza central", "", vec![1.0, 0.0]),
                doc(2, "Estación de tren", "", vec![0.9, 0.1]),
            ],
            1,
        );

        let hits = search_candidates(&snapshot, "estación", &[1.0, 0.0], &params());
        let gated = lexical_gate("estación", hits.clone());
        assert_eq!(gated.len(), 1);
        assert_eq!(gated[0].id(), 2);

        let none = lexical_gate("molino", hits.clone());
        assert_eq!(none.len(), 2);

        let short = lexical_gate("de", hits);
        assert_eq!(short.len(), 2);
    }
}
