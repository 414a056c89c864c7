//! Summary shaping: coerce text into 3 to 5 lines, and a local extractive fallback.

use crate::text::collapse_whitespace;
use regex::Regex;
use std::sync::OnceLock;

pub const MIN_SUMMARY_LINES: usize = 3;
pub const MAX_SUMMARY_LINES: usize = 5;

fn list_marker() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    // Bullets, or 1-2 digit enumerations, so leading years survive
    MARKER
        .get_or_init(|| Regex::new(r"^\s*(?:[-*•]+|\d{1,2}[.)])\s*").ok())
        .as_ref()
}

fn strip_list_marker(line: &str) -> String {
    match list_marker() {
        Some(re) => re.replace(line, "").trim().to_string(),
        None => line.trim().to_string(),
    }
}

/// Split after `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Reshape `text` into at most five clean lines, at least three when it has the material.
pub fn enforce_summary_lines(text: &str) -> String {
    let mut lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if lines.len() < MIN_SUMMARY_LINES {
        lines = split_sentences(&collapse_whitespace(text));
    }

    lines
        .iter()
        .map(|l| strip_list_marker(l))
        .filter(|l| !l.is_empty())
        .take(MAX_SUMMARY_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extractive summary: the leading `clamp(ceil(0.15 n), 3, 5)` sentences.
pub fn summarize_locally(text: &str) -> String {
    let sentences = split_sentences(&collapse_whitespace(text));
    if sentences.is_empty() {
        return String::new();
    }

    let wanted = ((sentences.len() as f64 * 0.15).ceil() as usize)
        .clamp(MIN_SUMMARY_LINES, MAX_SUMMARY_LINES);
    let picked: Vec<&str> = sentences.iter().take(wanted).map(String::as_str).collect();
    enforce_summary_lines(&picked.join("\n"))
}
