//! Error types for strictqa.
//!
//! One enum covers every error category in the workspace: configuration,
//! I/O, the answer generator, the document index, prompt rendering, the
//! answer cache and the calculation services.

use thiserror::Error;

/// Unified error type for strictqa.
///
/// Library functions return `Result<T, AppError>`. The routing controller
/// turns every collaborator error into a "not found" outcome, so these only
/// reach the user from administrative commands.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Answer generator errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document index and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Answer cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Calculation service transport or protocol errors
    #[error("Calculation service error: {0}")]
    Calculation(String),

    /// A caller-side deadline expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
