//! Answer text: dates, snippets, contexts and the fixed user-facing messages.

use crate::text::collapse_whitespace;
use crate::types::Document;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Characters of content shown in a multiple-choice preview.
pub const PREVIEW_CHARS: usize = 160;

/// Characters of content sent to the reranker per candidate.
pub const RERANK_SNIPPET_CHARS: usize = 800;

const ELLIPSIS: char = '…';

/// `DD-MM-YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Head of `text` with whitespace collapsed, `…` appended when cut.
pub fn build_snippet(text: &str, max_chars: usize) -> String {
    let clean = collapse_whitespace(text);
    if clean.chars().count() <= max_chars {
        return clean;
    }
    let mut head: String = clean.chars().take(max_chars).collect();
    head.push(ELLIPSIS);
    head
}

fn lower_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Window of `max_chars` around the first query word of four or more characters.
///
/// Falls back to [`build_snippet`] when no such word occurs in the text.
pub fn smart_snippet(text: &str, query: &str, max_chars: usize) -> String {
    let clean: Vec<char> = collapse_whitespace(text).chars().collect();
    if clean.is_empty() {
        return String::new();
    }

    let token = query.split_whitespace().find(|w| w.chars().count() >= 4);
    let Some(token) = token else {
        return build_snippet(text, max_chars);
    };

    let lowered: Vec<char> = clean.iter().copied().map(lower_char).collect();
    let needle: Vec<char> = token.chars().map(lower_char).collect();
    let Some(idx) = find_chars(&lowered, &needle) else {
        return build_snippet(text, max_chars);
    };

    let start = idx.saturating_sub(max_chars / 2);
    let end = (start + max_chars).min(clean.len());

    let mut out = String::new();
    if start > 0 {
        out.push(ELLIPSIS);
    }
    out.extend(&clean[start..end]);
    if end < clean.len() {
        out.push(ELLIPSIS);
    }
    out
}

/// Prompt context: title, optional date line, focused snippet.
pub fn build_context(doc: &Document, question: &str, snippet_chars: usize) -> String {
    let mut context = format!("{}\n", doc.title);
    if let Some(date) = doc.event_date {
        context.push_str(&format!("Date: {}\n", format_date(date)));
    }
    context.push_str(&smart_snippet(&doc.content, question, snippet_chars));
    context
}

/// Shorter context used for relevance scoring.
pub fn rerank_context(doc: &Document) -> String {
    let mut header = doc.title.clone();
    if let Some(date) = doc.event_date {
        header.push_str(&format!(" \u{2014} {}", format_date(date)));
    }
    format!("{}\n{}", header, build_snippet(&doc.content, RERANK_SNIPPET_CHARS))
}

/// Deterministic direct answer: `title — date` then the focused snippet.
pub fn format_answer(doc: &Document, query: &str, snippet_chars: usize) -> String {
    let mut header = doc.title.clone();
    if let Some(date) = doc.event_date {
        header.push_str(&format!(" \u{2014} {}", format_date(date)));
    }
    format!("{}\n{}", header, smart_snippet(&doc.content, query, snippet_chars))
}

/// Message for a query nothing matched, echoing it in example reformulations.
pub fn no_results_tip(query: &str, default_context: &str) -> String {
    let base = query.trim().replace('"', "");
    let context = default_context.trim();
    let ctx = if context.is_empty() {
        String::new()
    } else {
        format!(" {}", context)
    };

    let examples = [
        format!("{}{}", base, ctx),
        format!("founding of {}", base),
        format!("{} institution", base),
        format!("{}{} organization", base, ctx),
    ];
    let examples = examples
        .iter()
        .map(|e| format!("\u{201c}{}\u{201d}", e))
        .collect::<Vec<_>>()
        .join(" \u{b7} ");

    format!(
        "I could not find reliable enough information for \u{201c}{}\u{201d}. \
         Try adding a related place or institution, a more specific keyword \
         or an extra detail about the event or person.\n\nExamples: {}",
        base, examples
    )
}

/// Fill the `{q}` placeholder of the refine template.
pub fn refine_message(template: &str, query: &str) -> String {
    template.replace("{q}", query.trim())
}

pub fn could_not_open_message(id: i64) -> String {
    format!("Could not open document #{}.", id)
}

/// One option of a multiple-choice answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: i64,
    pub title: String,
    pub date: Option<String>,
    pub preview: String,
}

impl ChoiceOption {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            date: doc.event_date.map(format_date),
            preview: build_snippet(&doc.content, PREVIEW_CHARS),
        }
    }
}

pub const CHOICES_MESSAGE: &str = "Several documents match your question. Which one did you mean?";

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, content: &str, date: Option<NaiveDate>) -> Document {
        Document {
            id: 3,
            title: title.to_string(),
            content: content.to_string(),
            event_date: date,
            image_url: String::new(),
            tags: String::new(),
            source_url: String::new(),
            vector: None,
        }
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(1910, 3, 5).unwrap();
        assert_eq!(format_date(date), "05-03-1910");
    }

    #[test]
    fn test_build_snippet_truncates_by_chars() {
        assert_eq!(build_snippet("  hola\n  mundo ", 20), "hola mundo");
        assert_eq!(build_snippet("áéíóú xyz", 5), "áéíóú…");
    }

    #[test]
    fn test_smart_snippet_centers_on_token() {
        let text = format!("{} ESTACION {}", "a".repeat(50), "b".repeat(50));
        let snippet = smart_snippet(&text, "la estación", 20);
        // "estación" does not match "ESTACION" literally; falls back to the head
        assert!(snippet.starts_with("aaaa"));

        let snippet = smart_snippet(&text, "la Estacion", 20);
        assert!(snippet.starts_with('…'));
        assert!(snippet.ends_with('…'));
        assert!(snippet.contains("ESTACION"));
        assert_eq!(snippet.chars().count(), 22);
    }

    #[test]
    fn test_smart_snippet_without_long_token() {
        assert_eq!(smart_snippet("texto corto", "el", 100), "texto corto");
        assert_eq!(smart_snippet("", "algo", 100), "");
    }

    #[test]
    fn test_format_answer_with_and_without_date() {
        let dated = doc("Fundación", "El pueblo nació.", NaiveDate::from_ymd_opt(1910, 3, 5));
        assert_eq!(
            format_answer(&dated, "pueblo", 100),
            "Fundación \u{2014} 05-03-1910\nEl pueblo nació."
        );

        let undated = doc("Plaza", "Centro.", None);
        assert_eq!(format_answer(&undated, "", 100), "Plaza\nCentro.");
    }

    #[test]
    fn test_build_context_has_date_line() {
        let dated = doc("Fundación", "Texto.", NaiveDate::from_ymd_opt(1910, 3, 5));
        assert_eq!(build_context(&dated, "", 100), "Fundación\nDate: 05-03-1910\nTexto.");
    }

    #[test]
    fn test_no_results_tip_echoes_query() {
        let tip = no_results_tip("molino \"viejo\"", "Realicó");
        assert!(tip.contains("\u{201c}molino viejo Realicó\u{201d}"));
        assert!(tip.contains("founding of molino viejo"));
        assert!(tip.contains("molino viejo Realicó organization"));

        let tip = no_results_tip("molino", "");
        assert!(tip.contains("\u{201c}molino\u{201d} \u{b7} "));
    }

    #[test]
    fn test_refine_message() {
        assert_eq!(refine_message("Too broad: {q}", " deporte "), "Too broad: deporte");
    }

    #[test]
    fn test_choice_option_preview() {
        let d = doc("T", &"x".repeat(300), NaiveDate::from_ymd_opt(2000, 1, 2));
        let option = ChoiceOption::from_document(&d);
        assert_eq!(option.date.as_deref(), Some("02-01-2000"));
        assert_eq!(option.preview.chars().count(), PREVIEW_CHARS + 1);
    }
}
