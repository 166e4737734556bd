//! Ask command handler.

use clap::Args;
use std::time::Duration;
use strictqa_core::{config::AppConfig, AppError, AppResult};
use strictqa_router::{ResolveOptions, Router};

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Bypass the answer cache (neither read nor written)
    #[arg(long)]
    pub no_cache: bool,

    /// Print the full resolution result as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig, router: &Router) -> AppResult<()> {
        let question = self.question.join(" ");
        if question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        tracing::debug!("Question: {}", question);

        let options = ResolveOptions {
            use_cache: !self.no_cache,
        };
        let timeout = config.resolve_timeout_secs.map(Duration::from_secs);
        let result = super::resolve(router, &question, options, timeout).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", result.answer);
            eprintln!("{}", super::provenance(&result));
        }

        Ok(())
    }
}
