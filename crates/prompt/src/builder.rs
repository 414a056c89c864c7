//! Rendering of prompt definitions into completion-ready text.

use crate::types::{BuiltPrompt, PromptDefinition};
use curator_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// # Example
/// ```no_run
/// use curator_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "Town hall\nFounded in 1810".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("Prompt: {}", built.text);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let text = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        text,
        temperature: definition.temperature,
        max_tokens: definition.max_tokens,
        source_prompt_id: definition.id.clone(),
        resolved_variables: variables,
    })
}

/// Plain-text registry: prompts are not HTML, so nothing is escaped.
fn registry() -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry
}

fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    registry()
        .render_template(template, variables)
        .map_err(|e| AppError::Prompt(format!("Cannot render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_definition() -> PromptDefinition {
        PromptDefinition {
            id: "answer.natural".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            template: "Context:\n{{context}}\nQuestion: {{question}}".to_string(),
            temperature: 0.3,
            max_tokens: 300,
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars);
        assert_eq!(result.unwrap(), "Question: Hello, world!");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "A & B <c> \"d\"".to_string());

        let result = render_template("{{context}}", &vars).unwrap();
        assert_eq!(result, "A & B <c> \"d\"");
    }

    #[test]
    fn test_build_prompt_carries_params() {
        let def = create_test_definition();
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "Town hall".to_string());
        vars.insert("question".to_string(), "when?".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.text, "Context:\nTown hall\nQuestion: when?");
        assert_eq!(built.max_tokens, 300);
        assert_eq!(built.source_prompt_id, "answer.natural");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars);
        // Handlebars renders missing variables as empty string
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_render_template_syntax_error() {
        let vars = HashMap::new();
        assert!(render_template("{{#if flag}}never closed", &vars).is_err());
    }
}
