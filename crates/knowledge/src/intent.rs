//! Intent detection and heuristic re-ranking.

use crate::retrieval::sort_hits;
use crate::text::{find_year, normalize};
use crate::types::Hit;
use curator_core::config::{AppConfig, RankingConfig};
use regex::Regex;
use serde::Serialize;

const FOUNDING_PATTERN: &str = r"\b(fundacion|fundad\w*|fundo|founded|founding|foundation)\b";
const WHEN_PATTERN: &str = r"\b(cuando|fecha|when|date)\b";
const FOUNDING_LEAD_PATTERN: &str = r"^\s*(fundacion|foundation)\b";
const SUMMARY_PATTERN: &str = r"^\s*(resum|summar)";

const FOUNDING_PREFER_TERMS: [&str; 8] = [
    "fundación",
    "fundada",
    "fundó",
    "fundar",
    "origen",
    "acto fundacional",
    "founded",
    "foundation",
];

/// Detected intent of one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub name: String,
    /// Selects the `answer.<mode>` prompt
    pub prompt_mode: String,
    pub prefer_terms: Vec<String>,
    pub avoid_terms: Vec<String>,
}

#[derive(Debug, Clone)]
struct IntentRule {
    name: String,
    pattern: Regex,
    prompt_mode: String,
    prefer_terms: Vec<String>,
    avoid_terms: Vec<String>,
}

/// Compiled intent rules and ranking heuristics.
#[derive(Debug, Clone)]
pub struct IntentRanker {
    rules: Vec<IntentRule>,
    global_prefer: Vec<String>,
    global_avoid: Vec<String>,
    ranking: RankingConfig,
    anchor: Option<String>,
    founding_stems: Vec<String>,
    founding: Option<Regex>,
    when: Option<Regex>,
    founding_lead: Option<Regex>,
    summary: Option<Regex>,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Skipping invalid pattern '{}': {}", pattern, e);
            None
        }
    }
}

fn matches(re: &Option<Regex>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

impl IntentRanker {
    pub fn from_config(config: &AppConfig) -> Self {
        let rules = config
            .intents
            .iter()
            .enumerate()
            .filter_map(|(idx, rule)| {
                let pattern = compile(&format!("(?i){}", rule.detect))?;
                let name = if rule.name.trim().is_empty() {
                    format!("rule_{}", idx + 1)
                } else {
                    rule.name.clone()
                };
                Some(IntentRule {
                    name,
                    pattern,
                    prompt_mode: rule.prompt.clone(),
                    prefer_terms: rule.prefer_terms.clone(),
                    avoid_terms: rule.avoid_terms.clone(),
                })
            })
            .collect();

        Self {
            rules,
            global_prefer: config.terms.prefer_terms.clone(),
            global_avoid: config.terms.avoid_terms.clone(),
            ranking: config.ranking.clone(),
            anchor: config
                .domain
                .anchor
                .as_deref()
                .map(normalize)
                .filter(|a| !a.trim().is_empty()),
            founding_stems: config.domain.founding_stems.iter().map(|s| normalize(s)).collect(),
            founding: compile(FOUNDING_PATTERN),
            when: compile(WHEN_PATTERN),
            founding_lead: compile(FOUNDING_LEAD_PATTERN),
            summary: compile(SUMMARY_PATTERN),
        }
    }

    /// First configured rule matching the raw query, else the built-in heuristics.
    pub fn detect(&self, query: &str) -> Option<Intent> {
        if let Some(rule) = self.rules.iter().find(|r| r.pattern.is_match(query)) {
            return Some(Intent {
                name: rule.name.clone(),
                prompt_mode: rule.prompt_mode.clone(),
                prefer_terms: rule.prefer_terms.clone(),
                avoid_terms: rule.avoid_terms.clone(),
            });
        }

        let normalized = normalize(query);
        let asks_founding_date = (matches(&self.founding, &normalized)
            && matches(&self.when, &normalized))
            || matches(&self.founding_lead, &normalized);

        if asks_founding_date {
            return Some(Intent {
                name: "founding_date".to_string(),
                prompt_mode: "short_date".to_string(),
                prefer_terms: FOUNDING_PREFER_TERMS.iter().map(|s| s.to_string()).collect(),
                avoid_terms: Vec::new(),
            });
        }

        if matches(&self.summary, &normalized) {
            return Some(Intent {
                name: "summary_request".to_string(),
                prompt_mode: "summary".to_string(),
                prefer_terms: Vec::new(),
                avoid_terms: Vec::new(),
            });
        }

        None
    }

    /// Shift scores by prefer/avoid term counts and re-sort. No-op without an intent.
    pub fn apply_adjustments(&self, hits: &mut [Hit], intent: Option<&Intent>) {
        let Some(intent) = intent else {
            return;
        };

        let prefer: Vec<String> = self
            .global_prefer
            .iter()
            .chain(&intent.prefer_terms)
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let avoid: Vec<String> = self
            .global_avoid
            .iter()
            .chain(&intent.avoid_terms)
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if prefer.is_empty() && avoid.is_empty() {
            return;
        }

        for hit in hits.iter_mut() {
            let hay = hit.doc.haystack().to_lowercase();
            let prefer_count = prefer.iter().filter(|t| hay.contains(t.as_str())).count();
            let avoid_count = avoid.iter().filter(|t| hay.contains(t.as_str())).count();
            hit.score += prefer_count as f32 * self.ranking.weights.prefer
                - avoid_count as f32 * self.ranking.weights.avoid;
        }

        sort_hits(hits);
        tracing::debug!("Applied intent '{}' adjustments", intent.name);
    }

    /// Whether the query asks about a founding together with a "when" signal or the anchor.
    pub fn wants_strong_boost(&self, query: &str) -> bool {
        let normalized = normalize(query);
        if !matches(&self.founding, &normalized) {
            return false;
        }
        let anchored = self
            .anchor
            .as_deref()
            .is_some_and(|anchor| normalized.contains(anchor));
        matches(&self.when, &normalized) || anchored
    }

    /// Add the strong boost to founding-record titles. Returns whether it triggered.
    pub fn strong_boost(&self, query: &str, hits: &mut [Hit]) -> bool {
        if !self.wants_strong_boost(query) {
            return false;
        }

        let mut boosted = 0;
        for hit in hits.iter_mut() {
            let title = normalize(&hit.doc.title);
            let founding_title = self.founding_stems.iter().any(|s| title.contains(s.as_str()));
            let anchored = self
                .anchor
                .as_deref()
                .map_or(true, |anchor| title.contains(anchor));
            if founding_title && anchored {
                hit.score += self.ranking.strong_boost;
                boosted += 1;
            }
        }

        if boosted > 0 {
            sort_hits(hits);
            tracing::debug!("Strong boost applied to {} candidates", boosted);
        }
        true
    }
}

/// Keep only candidates dated in the year the query names, if any match.
pub fn prefer_exact_year(query: &str, hits: Vec<Hit>) -> Vec<Hit> {
    let Some(year) = find_year(query) else {
        return hits;
    };

    let same_year: Vec<Hit> = hits
        .iter()
        .filter(|h| h.doc.year() == Some(year))
        .cloned()
        .collect();

    if same_year.is_empty() {
        hits
    } else {
        tracing::debug!("Year {} narrowed candidates to {}", year, same_year.len());
        same_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use chrono::NaiveDate;
    use curator_core::config::IntentRuleConfig;
    use std::sync::Arc;

    fn hit(id: i64, title: &str, content: &str, score: f32) -> Hit {
        Hit {
            doc: Arc::new(Document {
                id,
                title: title.to_string(),
                content: content.to_string(),
                event_date: None,
                image_url: String::new(),
                tags: String::new(),
                source_url: String::new(),
                vector: None,
            }),
            cosine_sim: score,
            tag_sim: 0.0,
            token_overlap: 0,
            score,
        }
    }

    fn rule(name: &str, detect: &str, prompt: &str) -> IntentRuleConfig {
        IntentRuleConfig {
            name: name.to_string(),
            detect: detect.to_string(),
            prefer_terms: vec!["escuela".to_string()],
            avoid_terms: vec!["club".to_string()],
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn test_configured_rules_first_match_wins() {
        let mut config = AppConfig::default();
        config.intents = vec![
            rule("schools", "ESCUELA", "natural"),
            rule("anything", ".*", "summary"),
        ];
        let ranker = IntentRanker::from_config(&config);

        let intent = ranker.detect("historia de la escuela").unwrap();
        assert_eq!(intent.name, "schools");
        assert_eq!(intent.prompt_mode, "natural");
    }

    #[test]
    fn test_invalid_rule_is_skipped() {
        let mut config = AppConfig::default();
        config.intents = vec![rule("broken", "(unclosed", "natural")];
        let ranker = IntentRanker::from_config(&config);
        assert!(ranker.detect("(unclosed").is_none());
    }

    #[test]
    fn test_builtin_heuristics() {
        let ranker = IntentRanker::from_config(&AppConfig::default());

        let founding = ranker.detect("¿Cuándo fue la fundación del pueblo?").unwrap();
        assert_eq!(founding.name, "founding_date");
        assert_eq!(founding.prompt_mode, "short_date");
        assert!(founding.prefer_terms.contains(&"fundación".to_string()));

        assert_eq!(
            ranker.detect("Foundation of the library").map(|i| i.prompt_mode),
            Some("short_date".to_string())
        );
        assert_eq!(
            ranker.detect("Resumen de la inundación").map(|i| i.prompt_mode),
            Some("summary".to_string())
        );
        assert!(ranker.detect("estación de tren").is_none());
    }

    #[test]
    fn test_adjustments_reorder() {
        let ranker = IntentRanker::from_config(&AppConfig::default());
        let intent = Intent {
            name: "test".to_string(),
            prompt_mode: "natural".to_string(),
            prefer_terms: vec!["Escuela".to_string()],
            avoid_terms: vec!["club".to_string()],
        };

        let mut hits = vec![
            hit(1, "Club social", "", 0.80),
            hit(2, "Escuela 12", "", 0.75),
        ];
        ranker.apply_adjustments(&mut hits, Some(&intent));

        assert_eq!(hits[0].id(), 2);
        assert!((hits[0].score - 0.83).abs() < 1e-5);
        assert!((hits[1].score - 0.70).abs() < 1e-5);
    }

    #[test]
    fn test_global_terms_need_an_intent() {
        let mut config = AppConfig::default();
        config.terms.prefer_terms = vec!["escuela".to_string()];
        let ranker = IntentRanker::from_config(&config);

        let mut hits = vec![hit(1, "Escuela", "", 0.5)];
        ranker.apply_adjustments(&mut hits, None);
        assert_eq!(hits[0].score, 0.5);
    }

    #[test]
    fn test_strong_boost_with_anchor() {
        let mut config = AppConfig::default();
        config.domain.anchor = Some("Realicó".to_string());
        let ranker = IntentRanker::from_config(&config);

        let mut hits = vec![
            hit(1, "Fiesta aniversario", "", 0.8),
            hit(2, "Fundación de Realicó", "", 0.4),
            hit(3, "Fundación del club", "", 0.5),
        ];

        assert!(ranker.strong_boost("fundación realicó", &mut hits));
        assert_eq!(hits[0].id(), 2);
        assert!((hits[0].score - 0.9).abs() < 1e-5);
        assert_eq!(hits[2].id(), 3);
    }

    #[test]
    fn test_strong_boost_needs_founding_signal() {
        let ranker = IntentRanker::from_config(&AppConfig::default());
        let mut hits = vec![hit(1, "Fundación de la escuela", "", 0.4)];

        assert!(!ranker.strong_boost("historia de la escuela", &mut hits));
        assert_eq!(hits[0].score, 0.4);

        // No anchor configured: the "when" signal alone triggers it
        assert!(ranker.strong_boost("cuándo fue la fundación", &mut hits));
        assert!((hits[0].score - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_exact_year_fails_open() {
        let mut dated = hit(1, "Inundación", "", 0.5);
        Arc::get_mut(&mut dated.doc).unwrap().event_date = NaiveDate::from_ymd_opt(1914, 5, 1);
        let hits = vec![hit(2, "Otro", "", 0.9), dated];

        let narrowed = prefer_exact_year("inundación 1914", hits.clone());
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].id(), 1);

        assert_eq!(prefer_exact_year("inundación 1920", hits.clone()).len(), 2);
        assert_eq!(prefer_exact_year("inundación", hits).len(), 2);
    }
}
