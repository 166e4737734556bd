//! Command handlers for the strictqa CLI.

pub mod ask;
pub mod cache;
pub mod documents;
pub mod interactive;
pub mod serve;

pub use ask::AskCommand;
pub use cache::CacheCommand;
pub use documents::{DocsCommand, ScanCommand, StatusCommand};
pub use interactive::InteractiveCommand;
pub use serve::ServeCalcCommand;

use std::time::Duration;
use strictqa_core::{AppError, AppResult};
use strictqa_router::{FoundIn, ResolutionResult, ResolveOptions, Router};

/// Resolve one question, honoring the optional caller-side deadline.
pub(crate) async fn resolve(
    router: &Router,
    question: &str,
    options: ResolveOptions,
    timeout: Option<Duration>,
) -> AppResult<ResolutionResult> {
    match timeout {
        Some(limit) if options.use_cache => router.resolve_within(question, limit).await,
        Some(limit) => tokio::time::timeout(limit, router.resolve_with(question, options))
            .await
            .map_err(|_| AppError::Timeout(format!("resolution exceeded {}s", limit.as_secs_f64()))),
        None => Ok(router.resolve_with(question, options).await),
    }
}

/// One-line summary printed under an answer.
pub(crate) fn provenance(result: &ResolutionResult) -> String {
    let origin = match (&result.found_in, &result.service) {
        (FoundIn::CalculationService, Some(service)) => {
            format!("{} ({})", service.label, service.category)
        }
        (FoundIn::Documents, _) => format!("documents: {}", result.sources.join(", ")),
        (found_in, _) => found_in.to_string(),
    };
    let cached = if result.cached { ", cached" } else { "" };
    format!("[{}{}, {:.2}s]", origin, cached, result.elapsed.as_secs_f64())
}
