//! Confidence gate: turns a ranked candidate list into one response shape.

use crate::text::{find_year, word_count};
use crate::types::Hit;
use curator_core::config::{
    DisambiguationConfig, DomainConfig, GenericPolicy, NearTiePolicy, SearchConfig,
};

/// Most candidates offered when confidence is low.
pub const MAX_CHOICES: usize = 5;

/// Decides whether a query is specific enough to deserve a list of choices.
#[derive(Debug, Clone)]
pub struct DomainGate {
    enabled: bool,
    min_words: usize,
    allow_year: bool,
    hints: Vec<String>,
    wh_prefixes: Vec<String>,
    generic_policy: GenericPolicy,
}

impl DomainGate {
    pub fn new(domain: &DomainConfig, disambiguation: &DisambiguationConfig) -> Self {
        Self {
            enabled: disambiguation.gate_by_domain,
            min_words: domain.min_words_for_choices,
            allow_year: domain.allow_year_as_signal,
            hints: domain
                .hints
                .iter()
                .map(|h| h.to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            wh_prefixes: domain
                .wh_prefixes
                .iter()
                .map(|w| format!("{} ", w.to_lowercase()))
                .collect(),
            generic_policy: disambiguation.generic_single_word_policy,
        }
    }

    pub fn passes(&self, query: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let lowered = query.trim().to_lowercase();
        if lowered.is_empty() {
            return false;
        }

        word_count(&lowered) >= self.min_words
            || (self.allow_year && find_year(&lowered).is_some())
            || self.hints.iter().any(|h| lowered.contains(h.as_str()))
            || self.wh_prefixes.iter().any(|w| lowered.starts_with(w.as_str()))
            || self.generic_policy == GenericPolicy::Choices
    }
}

/// Terminal decision for a search request.
#[derive(Debug, Clone)]
pub enum GateDecision {
    Direct(Hit),
    Choices(Vec<Hit>),
    Refine,
    NoResults,
}

impl GateDecision {
    pub fn name(&self) -> &'static str {
        match self {
            GateDecision::Direct(_) => "direct_answer",
            GateDecision::Choices(_) => "multi_choice",
            GateDecision::Refine => "refine_prompt",
            GateDecision::NoResults => "no_results_tip",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceGate {
    min_best_score: f32,
    choice_delta: f32,
    near_tie_policy: NearTiePolicy,
    domain: DomainGate,
}

impl ConfidenceGate {
    pub fn new(
        search: &SearchConfig,
        disambiguation: &DisambiguationConfig,
        domain: &DomainConfig,
    ) -> Self {
        Self {
            min_best_score: search.min_best_score,
            choice_delta: disambiguation.choice_delta,
            near_tie_policy: disambiguation.near_tie_policy,
            domain: DomainGate::new(domain, disambiguation),
        }
    }

    pub fn domain_gate(&self) -> &DomainGate {
        &self.domain
    }

    fn choices_or_refine(&self, query: &str, options: Vec<Hit>) -> GateDecision {
        if self.domain.passes(query) {
            GateDecision::Choices(options)
        } else {
            GateDecision::Refine
        }
    }

    /// `hits` must already be in final order.
    pub fn decide(&self, query: &str, hits: &[Hit]) -> GateDecision {
        let Some(top) = hits.first() else {
            return GateDecision::NoResults;
        };

        if top.score < self.min_best_score {
            let options: Vec<Hit> = hits.iter().take(MAX_CHOICES).cloned().collect();
            if options.len() < 2 {
                return GateDecision::NoResults;
            }
            return self.choices_or_refine(query, options);
        }

        let close: Vec<Hit> = hits
            .iter()
            .filter(|h| top.score - h.score <= self.choice_delta)
            .cloned()
            .collect();

        if close.len() < 2 {
            return GateDecision::Direct(top.clone());
        }

        match self.near_tie_policy {
            NearTiePolicy::AlwaysChoices => GateDecision::Choices(close),
            NearTiePolicy::DomainGate => self.choices_or_refine(query, close),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use std::sync::Arc;

    fn hits(scores: &[f32]) -> Vec<Hit> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| Hit {
                doc: Arc::new(Document {
                    id: i as i64 + 1,
                    title: format!("Doc {}", i + 1),
                    content: String::new(),
                    event_date: None,
                    image_url: String::new(),
                    tags: String::new(),
                    source_url: String::new(),
                    vector: None,
                }),
                cosine_sim: score,
                tag_sim: 0.0,
                token_overlap: 1,
                score,
            })
            .collect()
    }

    fn gate_with(hints: &[&str], configure: impl FnOnce(&mut DisambiguationConfig)) -> ConfidenceGate {
        let mut domain = DomainConfig::default();
        domain.hints = hints.iter().map(|h| h.to_string()).collect();
        let mut disambiguation = DisambiguationConfig::default();
        configure(&mut disambiguation);
        ConfidenceGate::new(&SearchConfig::default(), &disambiguation, &domain)
    }

    fn gate() -> ConfidenceGate {
        gate_with(&["museo"], |_| {})
    }

    #[test]
    fn test_empty_is_no_results() {
        assert!(matches!(gate().decide("algo", &[]), GateDecision::NoResults));
    }

    #[test]
    fn test_clear_winner_is_direct() {
        let decision = gate().decide("escuela", &hits(&[0.90, 0.85]));
        match decision {
            GateDecision::Direct(hit) => assert_eq!(hit.id(), 1),
            other => panic!("expected direct answer, got {}", other.name()),
        }
    }

    #[test]
    fn test_low_confidence_single_generic_word_refines() {
        let decision = gate().decide("deporte", &hits(&[0.50, 0.45, 0.40]));
        assert!(matches!(decision, GateDecision::Refine));
    }

    #[test]
    fn test_low_confidence_with_hint_offers_choices() {
        let decision = gate().decide("museo", &hits(&[0.50, 0.45, 0.40]));
        match decision {
            GateDecision::Choices(options) => assert_eq!(options.len(), 3),
            other => panic!("expected choices, got {}", other.name()),
        }
    }

    #[test]
    fn test_low_confidence_signals() {
        let low = hits(&[0.50, 0.45]);
        // two words, a year, an interrogative prefix
        assert!(matches!(gate().decide("escuela rural", &low), GateDecision::Choices(_)));
        assert!(matches!(gate().decide("1914", &low), GateDecision::Choices(_)));
        assert!(matches!(gate().decide("¿qué?", &low), GateDecision::Refine));
        let wh = gate_with(&[], |d| d.gate_by_domain = true);
        assert!(wh.domain_gate().passes("cuando fue"));
    }

    #[test]
    fn test_low_confidence_single_candidate_is_no_results() {
        assert!(matches!(gate().decide("museo", &hits(&[0.50])), GateDecision::NoResults));
    }

    #[test]
    fn test_choices_policy_ignores_domain_gate() {
        let gate = gate_with(&[], |d| d.generic_single_word_policy = GenericPolicy::Choices);
        assert!(matches!(
            gate.decide("deporte", &hits(&[0.50, 0.45])),
            GateDecision::Choices(_)
        ));
    }

    #[test]
    fn test_gate_disabled_always_passes() {
        let gate = gate_with(&[], |d| d.gate_by_domain = false);
        assert!(matches!(
            gate.decide("deporte", &hits(&[0.50, 0.45])),
            GateDecision::Choices(_)
        ));
    }

    #[test]
    fn test_low_confidence_caps_choices_at_five() {
        let decision = gate().decide("museo", &hits(&[0.5, 0.49, 0.48, 0.47, 0.46, 0.45, 0.44]));
        match decision {
            GateDecision::Choices(options) => assert_eq!(options.len(), MAX_CHOICES),
            other => panic!("expected choices, got {}", other.name()),
        }
    }

    #[test]
    fn test_near_tie_policies() {
        let tied = hits(&[0.90, 0.89, 0.80]);

        match gate().decide("escuela rural", &tied) {
            GateDecision::Choices(options) => {
                let ids: Vec<i64> = options.iter().map(|h| h.id()).collect();
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("expected choices, got {}", other.name()),
        }
        assert!(matches!(gate().decide("deporte", &tied), GateDecision::Refine));

        let always = gate_with(&[], |d| d.near_tie_policy = NearTiePolicy::AlwaysChoices);
        assert!(matches!(always.decide("deporte", &tied), GateDecision::Choices(_)));
    }
}
