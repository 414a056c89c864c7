//! Prompt loader for YAML prompt overrides.

use crate::types::PromptDefinition;
use curator_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Read, parse and validate one prompt file.
///
/// ```no_run
/// let path = std::path::Path::new("prompts/answer.summary.yml");
/// let prompt = curator_prompt::load_prompt_file(path)?;
/// assert_eq!(prompt.id, "answer.summary");
/// # Ok::<(), curator_core::AppError>(())
/// ```
pub fn load_prompt_file(prompt_file: &Path) -> AppResult<PromptDefinition> {
    let prompt_err = |what: &str, e: &dyn std::fmt::Display| {
        AppError::Prompt(format!("{} {}: {}", what, prompt_file.display(), e))
    };

    let contents =
        std::fs::read_to_string(prompt_file).map_err(|e| prompt_err("Cannot read", &e))?;
    let definition: PromptDefinition =
        serde_yaml::from_str(&contents).map_err(|e| prompt_err("Malformed prompt", &e))?;

    validate_prompt(&definition).map_err(|e| prompt_err("Rejected prompt", &e))?;
    tracing::debug!(
        "Prompt override {} loaded from {}",
        definition.id,
        prompt_file.display()
    );
    Ok(definition)
}

/// Every `*.yml`/`*.yaml` file directly inside `prompts_dir`, in name order.
///
/// A missing directory yields no prompts. Any invalid file is an error.
pub fn load_prompt_dir(prompts_dir: &Path) -> AppResult<Vec<PromptDefinition>> {
    prompt_files(prompts_dir)
        .iter()
        .map(|path| load_prompt_file(path))
        .collect()
}

/// File stems of the prompt files in `prompts_dir`.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    Ok(prompt_files(prompts_dir)
        .iter()
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
        .collect())
}

fn is_prompt_file(path: &Path) -> bool {
    let ext = path.extension().and_then(|s| s.to_str());
    path.is_file() && matches!(ext, Some("yml" | "yaml"))
}

fn prompt_files(prompts_dir: &Path) -> Vec<PathBuf> {
    if !prompts_dir.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|path| is_prompt_file(path))
        .collect();
    files.sort();
    files
}

/// First violated rule of a definition, if any.
fn violation(def: &PromptDefinition) -> Option<String> {
    let required = [
        ("id", def.id.as_str()),
        ("title", def.title.as_str()),
        ("apiVersion", def.api_version.as_str()),
        ("template", def.template.as_str()),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Some(format!("{} is required", field));
    }

    let version_ok = def
        .api_version
        .split_once('.')
        .is_some_and(|(major, minor)| !major.is_empty() && !minor.is_empty());
    if !version_ok {
        return Some(format!(
            "apiVersion '{}' is not of the form x.y",
            def.api_version
        ));
    }

    if !(0.0..=2.0).contains(&def.temperature) {
        return Some(format!("temperature {} is outside [0, 2]", def.temperature));
    }
    if def.max_tokens == 0 {
        return Some("maxTokens must be positive".to_string());
    }
    None
}

pub(crate) fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    match violation(def) {
        Some(reason) => Err(AppError::Prompt(format!("prompt '{}': {}", def.id, reason))),
        None => Ok(()),
    }
}
