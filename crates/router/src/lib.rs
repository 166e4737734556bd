//! Question routing for strictqa.
//!
//! The [`Router`] answers a question from the answer cache, the document
//! index or a calculation service, in that order, and falls back to
//! [`NOT_FOUND_ANSWER`]. Document answers must pass the acceptance filter
//! before they are trusted.

pub mod acceptance;
pub mod cache;
pub mod calculation;
pub mod classifier;
pub mod fingerprint;
pub mod relevance;
pub mod result;
pub mod router;
pub mod stages;

pub use acceptance::{accept, Acceptance, RejectReason};
pub use cache::{CacheEntry, CacheStore, OperationRecord, SqliteCacheStore};
pub use calculation::{CalculationChain, CalculationOutcome, CalculationService, HttpCalculationService};
pub use classifier::is_computational;
pub use fingerprint::{fingerprint, normalize};
pub use relevance::{admit, distance_to_similarity, ScoredSnippet};
pub use result::{FoundIn, ResolutionResult, ServiceMeta};
pub use router::{ResolveOptions, Router, RouterBuilder, RouterStatus, NOT_FOUND_ANSWER};
pub use stages::{ResolutionStage, StageOutcome};
