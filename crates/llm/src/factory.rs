//! Answer generator factory.
//!
//! Builds the configured [`LlmClient`] from [`LlmSettings`].

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;
use strictqa_core::config::LlmSettings;
use strictqa_core::{AppError, AppResult};

/// Create an answer generator client from settings.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown and
/// `AppError::Llm` if the HTTP client cannot be built.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(&settings.provider) {
        Some(ProviderType::Ollama) => {
            let client = OllamaClient::with_timeout(
                &settings.endpoint,
                Duration::from_secs(settings.timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
        None => Err(AppError::Config(format!(
            "Unknown provider: {}",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&LlmSettings::default()).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let settings = LlmSettings {
            endpoint: "http://localhost:8080".to_string(),
            ..Default::default()
        };
        assert!(create_client(&settings).is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let settings = LlmSettings {
            provider: "unknown".to_string(),
            ..Default::default()
        };
        match create_client(&settings) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
