//! Calculation-service fallback chain.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strictqa_core::config::{CalculationServiceSettings, CalculationSettings};
use strictqa_core::{AppError, AppResult};

/// Result of asking one calculation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationOutcome {
    pub found: bool,
    pub answer: String,
    /// Label of the service that produced the outcome
    pub label: String,
    pub category: String,
}

impl CalculationOutcome {
    pub fn not_found(label: &str) -> Self {
        Self {
            found: false,
            answer: String::new(),
            label: label.to_string(),
            category: String::new(),
        }
    }
}

/// A remote evaluator for computational questions.
#[async_trait::async_trait]
pub trait CalculationService: Send + Sync {
    fn label(&self) -> &str;

    /// Ask the service. `Err` covers transport failures, timeouts, non-2xx
    /// statuses and malformed bodies.
    async fn evaluate(&self, question: &str) -> AppResult<CalculationOutcome>;
}

#[derive(Debug, Serialize)]
struct ServiceRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    answer: String,
    success: bool,
    #[serde(default)]
    calculation_type: Option<String>,
}

/// Calculation service reached over HTTP with a JSON body.
pub struct HttpCalculationService {
    label: String,
    endpoint: String,
    default_category: String,
    client: reqwest::Client,
}

impl HttpCalculationService {
    pub fn new(settings: &CalculationServiceSettings, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::Calculation(format!(
                    "Failed to create HTTP client for {}: {}",
                    settings.label, e
                ))
            })?;

        Ok(Self {
            label: settings.label.clone(),
            endpoint: format!(
                "{}/{}",
                settings.url.trim_end_matches('/'),
                settings.path.trim_start_matches('/')
            ),
            default_category: settings.default_category.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl CalculationService for HttpCalculationService {
    fn label(&self) -> &str {
        &self.label
    }

    async fn evaluate(&self, question: &str) -> AppResult<CalculationOutcome> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ServiceRequest { question })
            .send()
            .await
            .map_err(|e| AppError::Calculation(format!("{} unreachable: {}", self.label, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Calculation(format!(
                "{} returned HTTP {}",
                self.label, status
            )));
        }

        let body: ServiceResponse = response.json().await.map_err(|e| {
            AppError::Calculation(format!("{} sent a malformed response: {}", self.label, e))
        })?;

        if !body.success {
            return Ok(CalculationOutcome::not_found(&self.label));
        }

        Ok(CalculationOutcome {
            found: true,
            answer: body.answer,
            label: self.label.clone(),
            category: body
                .calculation_type
                .unwrap_or_else(|| self.default_category.clone()),
        })
    }
}

/// Services tried in priority order; the first positive outcome wins.
#[derive(Clone, Default)]
pub struct CalculationChain {
    services: Vec<Arc<dyn CalculationService>>,
}

impl CalculationChain {
    pub fn new(services: Vec<Arc<dyn CalculationService>>) -> Self {
        Self { services }
    }

    /// Build HTTP services from settings, in configured order.
    pub fn from_settings(settings: &CalculationSettings) -> AppResult<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let services = settings
            .services
            .iter()
            .map(|s| {
                HttpCalculationService::new(s, timeout)
                    .map(|svc| Arc::new(svc) as Arc<dyn CalculationService>)
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self { services })
    }

    pub fn labels(&self) -> Vec<String> {
        self.services.iter().map(|s| s.label().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Ask each service in turn. Errors count as "not found" for that
    /// service.
    pub async fn run(&self, question: &str) -> Option<CalculationOutcome> {
        for service in &self.services {
            tracing::debug!("Checking {}", service.label());
            match service.evaluate(question).await {
                Ok(outcome) if outcome.found => {
                    tracing::info!("Answer found in {}", service.label());
                    return Some(outcome);
                }
                Ok(_) => tracing::debug!("Not found in {}", service.label()),
                Err(e) => tracing::warn!("{} failed: {}", service.label(), e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        label: &'static str,
        reply: Option<&'static str>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(label: &'static str, reply: Option<&'static str>, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                label,
                reply,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl CalculationService for Fixed {
        fn label(&self) -> &str {
            self.label
        }

        async fn evaluate(&self, _question: &str) -> AppResult<CalculationOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Calculation("connection refused".to_string()));
            }
            Ok(match self.reply {
                Some(answer) => CalculationOutcome {
                    found: true,
                    answer: answer.to_string(),
                    label: self.label.to_string(),
                    category: "test".to_string(),
                },
                None => CalculationOutcome::not_found(self.label),
            })
        }
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = Fixed::new("First API", Some("one"), false);
        let second = Fixed::new("Second API", Some("two"), false);
        let chain = CalculationChain::new(vec![first.clone(), second.clone()]);

        let outcome = chain.run("q").await.unwrap();
        assert_eq!(outcome.answer, "one");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_and_miss_fall_through() {
        let broken = Fixed::new("Broken API", None, true);
        let empty = Fixed::new("Empty API", None, false);
        let last = Fixed::new("Last API", Some("three"), false);
        let chain = CalculationChain::new(vec![broken.clone(), empty.clone(), last]);

        let outcome = chain.run("q").await.unwrap();
        assert_eq!(outcome.label, "Last API");
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain() {
        let chain = CalculationChain::new(vec![Fixed::new("Empty API", None, false)]);
        assert!(chain.run("q").await.is_none());
        assert!(CalculationChain::default().run("q").await.is_none());
    }

    #[test]
    fn test_endpoint_join() {
        let settings = CalculationServiceSettings {
            label: "Math API".to_string(),
            url: "http://localhost:8002/".to_string(),
            path: "/calculate".to_string(),
            default_category: "unknown".to_string(),
        };
        let service = HttpCalculationService::new(&settings, Duration::from_secs(1)).unwrap();
        assert_eq!(service.endpoint(), "http://localhost:8002/calculate");
    }

    #[test]
    fn test_chain_from_default_settings() {
        let chain = CalculationChain::from_settings(&CalculationSettings::default()).unwrap();
        assert_eq!(chain.labels(), vec!["Factorization API", "Math API"]);
    }
}
