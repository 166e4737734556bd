//! Prompt rendering for strictqa.
//!
//! This crate provides:
//! - The built-in strict document prompt
//! - YAML prompt overrides under `.strictqa/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{default_prompt, load_prompt, DEFAULT_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
