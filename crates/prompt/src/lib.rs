//! Prompt system for Curator.
//!
//! This crate provides structured prompt management with:
//! - Built-in prompt definitions for every generation step
//! - YAML-based overrides loaded from a directory
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use library::PromptLibrary;
pub use loader::{list_prompts, load_prompt_dir, load_prompt_file};
pub use types::{BuiltPrompt, PromptDefinition};
