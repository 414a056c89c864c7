//! Built-in prompt definitions.
//!
//! Template variables:
//! - `context`: title, optional `Date: DD-MM-YYYY` line, and a snippet
//! - `question`: the raw user query
//! - `action_prompt`: caller-supplied instruction (`answer.custom`)
//! - `query`, `text`: rerank inputs
//! - `original`: query to rewrite

use crate::types::PromptDefinition;

pub const ANSWER_NATURAL: &str = "answer.natural";
pub const ANSWER_SHORT_DATE: &str = "answer.short_date";
pub const ANSWER_SUMMARY: &str = "answer.summary";
pub const ANSWER_CUSTOM: &str = "answer.custom";
pub const RERANK_SCORE: &str = "rerank.score";
pub const QUERY_REWRITE: &str = "query.rewrite";

const NATURAL_TEMPLATE: &str = "\
You are a neutral, friendly writer. Do not invent anything.
Write a short, clear, human message using ONLY this context.
If the user asks for a summary, return 3 to 5 lines with the central idea and 2 key facts.

Context:
{{context}}

Question:
{{question}}

Answer:";

const SHORT_DATE_TEMPLATE: &str = "\
You are an archivist. Do not invent anything.
If the context contains a founding date, answer ONLY with:
1) The date (DD-MM-YYYY if present, otherwise YYYY).
2) One short sentence (at most 20 words).

Context:
{{context}}

Question:
{{question}}

Answer (at most 2 lines):";

const SUMMARY_TEMPLATE: &str = "\
You are an archivist. Do not invent anything.
Summarize the context in 3 to 5 lines: the central idea plus 2 key facts (dates or places).
No opinions, no embellishment. Plain and concise.

Context:
{{context}}

Answer:";

const CUSTOM_TEMPLATE: &str = "\
{{action_prompt}}

Context:
{{context}}

Answer:";

const RERANK_TEMPLATE: &str = "\
You are a relevance judge. Given a QUERY and a TEXT, return only an integer from 0 to 100.
0 = unrelated, 100 = answers it perfectly.

QUERY:
{{query}}

TEXT:
{{text}}

Output:";

const REWRITE_TEMPLATE: &str = "\
You will improve a short query for a semantic search engine.
Fix typos and return ONE improved query (3 to 8 keywords).
Do not invent proper names.

Original query:
{{original}}

Return only the query:";

fn definition(id: &str, title: &str, template: &str, temperature: f32, max_tokens: u32) -> PromptDefinition {
    PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        template: template.to_string(),
        temperature,
        max_tokens,
    }
}

/// Every built-in definition.
pub fn builtin_prompts() -> Vec<PromptDefinition> {
    vec![
        definition(ANSWER_NATURAL, "Natural answer", NATURAL_TEMPLATE, 0.3, 300),
        definition(ANSWER_SHORT_DATE, "Short dated answer", SHORT_DATE_TEMPLATE, 0.2, 120),
        definition(ANSWER_SUMMARY, "Summary", SUMMARY_TEMPLATE, 0.3, 240),
        definition(ANSWER_CUSTOM, "Custom action", CUSTOM_TEMPLATE, 0.3, 240),
        definition(RERANK_SCORE, "Relevance score", RERANK_TEMPLATE, 0.0, 16),
        definition(QUERY_REWRITE, "Query rewrite", REWRITE_TEMPLATE, 0.2, 64),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique() {
        let prompts = builtin_prompts();
        let ids: HashSet<_> = prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), prompts.len());
        assert!(ids.contains(ANSWER_NATURAL));
        assert!(ids.contains(QUERY_REWRITE));
    }

    #[test]
    fn test_rerank_is_deterministic() {
        let rerank = builtin_prompts()
            .into_iter()
            .find(|p| p.id == RERANK_SCORE)
            .unwrap();
        assert_eq!(rerank.temperature, 0.0);
        assert_eq!(rerank.max_tokens, 16);
    }
}
