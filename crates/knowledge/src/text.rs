//! Text normalization and lexical similarity.
//!
//! Everything here works on normalized text: lowercase, canonical
//! decomposition with combining marks removed, so `Fundación` and
//! `fundacion` compare equal.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this never count as query terms.
pub const MIN_TOKEN_CHARS: usize = 4;

/// Stemming suffixes. The longest one that leaves a long enough stem wins;
/// list order breaks ties.
const STEM_SUFFIXES: [&str; 29] = [
    "ciones", "siones", "mente", "idades", "adora", "adores", "adoras", "acion", "sion", "idad",
    "ados", "adas", "idos", "idas", "ando", "iendo", "ador", "cion", "do", "da", "os", "as", "ar",
    "er", "ir", "ado", "ada", "ido", "ida",
];

/// Lowercase and strip diacritics.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Split already-normalized text on runs of non-word characters.
pub fn split_words(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Normalized query tokens of at least [`MIN_TOKEN_CHARS`] characters.
pub fn query_tokens(query: &str) -> Vec<String> {
    let normalized = normalize(query);
    split_words(&normalized)
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Crude suffix stemmer for Spanish-like morphology.
pub fn stem(token: &str) -> String {
    let normalized = normalize(token);
    let len = normalized.chars().count();

    let best = STEM_SUFFIXES
        .iter()
        .copied()
        .filter(|suffix| {
            normalized.ends_with(*suffix) && len - suffix.chars().count() >= MIN_TOKEN_CHARS
        })
        .fold(None::<&str>, |best, suffix| match best {
            Some(b) if b.len() >= suffix.len() => Some(b),
            _ => Some(suffix),
        });

    match best {
        Some(suffix) => normalized[..normalized.len() - suffix.len()].to_string(),
        None => normalized,
    }
}

/// Number of query tokens found in `haystack`, directly or by stem.
pub fn token_overlap_count(query: &str, haystack: &str) -> usize {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return 0;
    }

    let hay = normalize(haystack);
    tokens
        .iter()
        .filter(|token| {
            if hay.contains(token.as_str()) {
                return true;
            }
            let base = stem(token);
            base.chars().count() >= MIN_TOKEN_CHARS && hay.contains(base.as_str())
        })
        .count()
}

/// Drop digits and a trailing plural `es`/`s`.
pub fn singularize(word: &str) -> String {
    let without_digits: String = word.chars().filter(|c| !c.is_ascii_digit()).collect();
    if let Some(stripped) = without_digits.strip_suffix("es") {
        stripped.to_string()
    } else if let Some(stripped) = without_digits.strip_suffix('s') {
        stripped.to_string()
    } else {
        without_digits
    }
}

/// Normalized, singularized token set.
pub fn token_set(text: &str) -> HashSet<String> {
    let normalized = normalize(text);
    split_words(&normalized)
        .map(singularize)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Jaccard index; 0 when both sets are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Best Jaccard similarity between the query and any single comma-separated tag.
pub fn best_tag_sim(query: &str, tags: &str) -> f32 {
    let query_set = token_set(query);
    if query_set.is_empty() {
        return 0.0;
    }

    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|tag| jaccard(&query_set, &token_set(tag)))
        .fold(0.0, f32::max)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn year_regex() -> Option<&'static Regex> {
    static YEAR: OnceLock<Option<Regex>> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b(?:18|19|20)\d{2}\b").ok())
        .as_ref()
}

/// First plausible four-digit year (1800-2099) on word boundaries.
pub fn find_year(text: &str) -> Option<i32> {
    year_regex()?
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Fundación de Realicó"), "fundacion de realico");
        assert_eq!(normalize("ÑANDÚ"), "nandu");
    }

    #[test]
    fn test_query_tokens_min_length() {
        assert_eq!(
            query_tokens("¿Cuándo se fundó el club?"),
            vec!["cuando".to_string(), "fundo".to_string(), "club".to_string()]
        );
    }

    #[test]
    fn test_stem_longest_matching_suffix() {
        assert_eq!(stem("fundaciones"), "funda");
        assert_eq!(stem("inauguración"), "inaugur");
        // "ada" beats "da"
        assert_eq!(stem("fundada"), "fund");
        assert_eq!(stem("fundado"), "fund");
        // remainder would be too short
        assert_eq!(stem("dado"), "dado");
    }

    #[test]
    fn test_overlap_by_token_or_stem() {
        let haystack = "La fundación del pueblo ocurrió en 1910";
        assert_eq!(token_overlap_count("fundaciones pueblo", haystack), 2);
        assert_eq!(token_overlap_count("fundación", haystack), 1);
        assert_eq!(token_overlap_count("el de la", haystack), 0);
        assert_eq!(token_overlap_count("ferrocarril", haystack), 0);
        assert_eq!(token_overlap_count("fundado", "Se fundó la escuela"), 1);
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("escuelas"), "escuela");
        assert_eq!(singularize("canciones"), "cancion");
        assert_eq!(singularize("club2024"), "club");
    }

    #[test]
    fn test_jaccard_bounds() {
        let a = token_set("escuela rural");
        let b = token_set("Escuelas rurales");
        let c = token_set("ferrocarril");
        assert_eq!(jaccard(&a, &b), 1.0);
        assert_eq!(jaccard(&a, &c), 0.0);
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_best_tag_sim_takes_best_tag() {
        let sim = best_tag_sim("escuela", "historia, escuelas, deporte");
        assert_eq!(sim, 1.0);
        assert_eq!(best_tag_sim("", "historia"), 0.0);
        assert_eq!(best_tag_sim("escuela", ""), 0.0);
    }

    #[test]
    fn test_find_year() {
        assert_eq!(find_year("inundación de 1914"), Some(1914));
        assert_eq!(find_year("año 2150"), None);
        assert_eq!(find_year("código 119140"), None);
        assert_eq!(find_year("sin año"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n b\tc "), "a b c");
    }
}
