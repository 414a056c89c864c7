//! Prompt library: built-in definitions overlaid with directory overrides.

use crate::builder::build_prompt;
use crate::builtin::{builtin_prompts, ANSWER_NATURAL};
use crate::loader::load_prompt_dir;
use crate::types::{BuiltPrompt, PromptDefinition};
use curator_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// All prompts known to the process, keyed by id.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Library holding only the built-in definitions.
    pub fn builtin() -> Self {
        let prompts = builtin_prompts()
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        Self { prompts }
    }

    /// Built-ins, then every definition found in `dir` replacing or adding by id.
    pub fn load(dir: Option<&Path>) -> AppResult<Self> {
        let mut library = Self::builtin();

        if let Some(dir) = dir {
            for def in load_prompt_dir(dir)? {
                tracing::info!("Prompt override: {} from {:?}", def.id, dir);
                library.prompts.insert(def.id.clone(), def);
            }
        }

        Ok(library)
    }

    pub fn get(&self, id: &str) -> Option<&PromptDefinition> {
        self.prompts.get(id)
    }

    /// Prompt id for an answer mode; unknown modes fall back to `answer.natural`.
    pub fn answer_prompt_id(&self, mode: &str) -> String {
        let id = format!("answer.{}", mode);
        if self.prompts.contains_key(&id) {
            id
        } else {
            tracing::debug!("No prompt for mode '{}', using {}", mode, ANSWER_NATURAL);
            ANSWER_NATURAL.to_string()
        }
    }

    /// Render prompt `id` with `variables`.
    pub fn render(&self, id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        let def = self
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))?;
        build_prompt(def, variables)
    }

    /// Sorted prompt ids.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.prompts.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{ANSWER_SHORT_DATE, ANSWER_SUMMARY, QUERY_REWRITE};
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_answer_mode_fallback() {
        let library = PromptLibrary::builtin();
        assert_eq!(library.answer_prompt_id("short_date"), ANSWER_SHORT_DATE);
        assert_eq!(library.answer_prompt_id("summary"), ANSWER_SUMMARY);
        assert_eq!(library.answer_prompt_id("poem"), ANSWER_NATURAL);
    }

    #[test]
    fn test_render_builtin() {
        let library = PromptLibrary::builtin();
        let built = library
            .render(QUERY_REWRITE, vars(&[("original", "fundasion club")]))
            .unwrap();
        assert!(built.text.contains("fundasion club"));
        assert_eq!(built.max_tokens, 64);
    }

    #[test]
    fn test_render_unknown_prompt() {
        let library = PromptLibrary::builtin();
        assert!(library.render("nope", HashMap::new()).is_err());
    }

    #[test]
    fn test_directory_override_replaces_builtin() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("summary.yml"),
            "id: answer.summary\ntitle: Terse\napiVersion: \"1.0\"\ntemplate: \"TL;DR {{context}}\"\nmaxTokens: 80\n",
        )
        .unwrap();

        let library = PromptLibrary::load(Some(temp_dir.path())).unwrap();
        let built = library
            .render(ANSWER_SUMMARY, vars(&[("context", "body")]))
            .unwrap();

        assert_eq!(built.text, "TL;DR body");
        assert_eq!(built.max_tokens, 80);
        assert_eq!(library.ids().len(), 6);
    }

    #[test]
    fn test_invalid_override_fails_load() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("bad.yml"), "id: [").unwrap();
        assert!(PromptLibrary::load(Some(temp_dir.path())).is_err());
    }
}
