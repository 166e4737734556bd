//! Concrete answer generator providers.

pub mod ollama;

pub use ollama::OllamaClient;
