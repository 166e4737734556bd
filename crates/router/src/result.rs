//! What the controller hands back for every question.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Which backend produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FoundIn {
    Cache,
    Documents,
    CalculationService,
    None,
}

impl fmt::Display for FoundIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FoundIn::Cache => "cache",
            FoundIn::Documents => "documents",
            FoundIn::CalculationService => "calculation-service",
            FoundIn::None => "none",
        };
        f.write_str(name)
    }
}

/// Calculation service that answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMeta {
    pub label: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    pub answer: String,
    pub sources: Vec<String>,
    pub cached: bool,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub found_in: FoundIn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceMeta>,
    /// Creation time of the cache entry, on cache hits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

fn as_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
