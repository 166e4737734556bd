//! Prompt loader: built-in strict prompt plus YAML overrides.

use crate::types::PromptDefinition;
use std::path::Path;
use strictqa_core::{config::STATE_DIR, AppError, AppResult};

/// Identifier of the prompt used by the document stage.
pub const DEFAULT_PROMPT_ID: &str = "strict.document";

const STRICT_TEMPLATE: &str = r#"You are a STRICT Knowledge Base Question Answering System.

The knowledge base contains text documents, Markdown notes and CSV tables
whose rows are written as "Row N: column: value | ...".

RULES (no exceptions):

1. Answer ONLY from the Knowledge Base Content below.
2. For data value questions ("what is the value of X"), give the exact value from the content.
3. For table data, when a field name is mentioned, give its corresponding value directly.
4. Do NOT use your own knowledge.
5. Do NOT guess, assume, infer or hallucinate.
6. If the exact answer is NOT clearly present, respond ONLY with:
   "Not Found in Knowledge Base"
7. Short numeric answers (like "100.0" or "25") are acceptable when they appear in the content.

---------------------------------

Knowledge Base Content:
{{context}}

---------------------------------

User Question:
{{question}}

---------------------------------

Answer (provide exact data value if found, otherwise "Not Found in Knowledge Base"):
"#;

/// The built-in strict document prompt.
pub fn default_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_PROMPT_ID.to_string(),
        title: "Strict knowledge base answer".to_string(),
        api_version: "1.0".to_string(),
        created_by: "strictqa".to_string(),
        system: None,
        template: STRICT_TEMPLATE.to_string(),
    }
}

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/.strictqa/prompts/<id>.yml` first. When no override
/// exists, [`DEFAULT_PROMPT_ID`] resolves to [`default_prompt`]; any other id
/// is an error.
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(STATE_DIR)
        .join("prompts")
        .join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        if prompt_id == DEFAULT_PROMPT_ID {
            tracing::debug!("Using built-in prompt: {}", prompt_id);
            return Ok(default_prompt());
        }
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // Without a question slot the generator never sees what was asked.
    if !def.template.contains("{{question}}") {
        return Err(AppError::Prompt(format!(
            "Prompt {} does not reference {{{{question}}}}",
            def.id
        )));
    }

    Ok(())
}
