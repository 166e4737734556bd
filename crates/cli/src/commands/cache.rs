//! Answer cache administration.

use clap::{Args, Subcommand};
use strictqa_core::AppResult;
use strictqa_router::Router;

/// Manage the answer cache
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove every cached answer
    Clear,
}

impl CacheCommand {
    pub async fn execute(&self, router: &Router) -> AppResult<()> {
        match self.action {
            CacheAction::Clear => {
                let removed = router.clear_cache()?;
                tracing::info!("Cleared {} cached answers", removed);
                println!("Removed {} cached answer(s)", removed);
            }
        }
        Ok(())
    }
}
