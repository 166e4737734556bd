//! Answer generator integration for strictqa.
//!
//! The routing controller treats the language model as an external
//! collaborator: it hands over a fully rendered prompt and gets free text
//! back. This crate provides that seam as the [`LlmClient`] trait plus a
//! provider for a local Ollama runtime.
//!
//! # Example
//! ```no_run
//! use strictqa_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is the boiling point listed in the table?", "phi3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::ProviderType;
