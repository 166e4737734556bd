//! Resolution stages tried after the cache misses.
//!
//! Each stage either resolves the question or passes. The controller walks
//! the list in order and stops at the first [`StageOutcome::Resolved`].

use std::sync::Arc;

use strictqa_core::AppResult;
use strictqa_knowledge::DocumentRetriever;
use strictqa_llm::{LlmClient, LlmRequest};
use strictqa_prompt::{build_prompt, PromptDefinition};

use crate::acceptance::{accept, Acceptance};
use crate::calculation::CalculationChain;
use crate::relevance::admit;
use crate::result::{FoundIn, ServiceMeta};

/// A positive answer from one stage, before caching.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub answer: String,
    pub context: String,
    pub sources: Vec<String>,
    pub found_in: FoundIn,
    pub service: Option<ServiceMeta>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Resolved(Resolution),
    Unresolved,
}

#[async_trait::async_trait]
pub trait ResolutionStage: Send + Sync {
    fn name(&self) -> &str;

    /// Stages returning true are skipped for computational questions.
    fn skips_computational(&self) -> bool {
        false
    }

    /// `Err` is treated by the controller like [`StageOutcome::Unresolved`].
    async fn attempt(&self, question: &str) -> AppResult<StageOutcome>;
}

/// Retrieval, strict prompt, answer generator and acceptance filter.
pub struct DocumentStage {
    pub retriever: Arc<dyn DocumentRetriever>,
    pub llm: Arc<dyn LlmClient>,
    pub prompt: PromptDefinition,
    pub model: String,
    pub temperature: Option<f32>,
    pub top_k: usize,
    pub min_similarity: f32,
}

#[async_trait::async_trait]
impl ResolutionStage for DocumentStage {
    fn name(&self) -> &str {
        "documents"
    }

    fn skips_computational(&self) -> bool {
        true
    }

    async fn attempt(&self, question: &str) -> AppResult<StageOutcome> {
        let snippets = self.retriever.search(question, self.top_k).await?;
        let admitted = admit(&snippets, question, self.min_similarity);
        if admitted.is_empty() {
            tracing::debug!("No relevant document content");
            return Ok(StageOutcome::Unresolved);
        }

        let context = admitted
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let built = build_prompt(&self.prompt, &context, question)?;
        let mut request = LlmRequest::new(built.user, &self.model);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.llm.complete(&request).await?;
        let answer = response.content.trim().to_string();

        if let Acceptance::Rejected(reason) = accept(&answer) {
            tracing::info!(%reason, "Generated answer rejected");
            return Ok(StageOutcome::Unresolved);
        }

        let mut sources: Vec<String> = Vec::new();
        for snippet in &admitted {
            if !sources.contains(&snippet.source_id) {
                sources.push(snippet.source_id.clone());
            }
        }

        Ok(StageOutcome::Resolved(Resolution {
            answer,
            context,
            sources,
            found_in: FoundIn::Documents,
            service: None,
        }))
    }
}

/// Calculation services in priority order.
pub struct CalculationStage {
    pub chain: CalculationChain,
}

#[async_trait::async_trait]
impl ResolutionStage for CalculationStage {
    fn name(&self) -> &str {
        "calculation"
    }

    async fn attempt(&self, question: &str) -> AppResult<StageOutcome> {
        Ok(match self.chain.run(question).await {
            Some(outcome) => StageOutcome::Resolved(Resolution {
                answer: outcome.answer,
                context: outcome.label.clone(),
                sources: vec![outcome.label.clone()],
                found_in: FoundIn::CalculationService,
                service: Some(ServiceMeta {
                    label: outcome.label,
                    category: outcome.category,
                }),
            }),
            None => StageOutcome::Unresolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictqa_core::AppError;
    use strictqa_knowledge::{DocumentRecord, RetrievedSnippet};
    use strictqa_llm::{LlmResponse, LlmUsage};
    use strictqa_prompt::default_prompt;

    struct Snippets(Vec<(&'static str, &'static str, f32)>);

    #[async_trait::async_trait]
    impl DocumentRetriever for Snippets {
        async fn search(&self, _question: &str, k: usize) -> AppResult<Vec<RetrievedSnippet>> {
            Ok(self
                .0
                .iter()
                .take(k)
                .map(|(content, source, distance)| RetrievedSnippet {
                    content: content.to_string(),
                    source_id: source.to_string(),
                    distance: *distance,
                })
                .collect())
        }

        fn document_count(&self) -> AppResult<usize> {
            Ok(self.0.len())
        }

        fn documents(&self) -> AppResult<Vec<DocumentRecord>> {
            Ok(vec![])
        }

        async fn scan(&self) -> AppResult<usize> {
            Ok(0)
        }
    }

    struct Reply(Result<&'static str, &'static str>);

    #[async_trait::async_trait]
    impl LlmClient for Reply {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            assert!(request.prompt.contains("Question:") || request.prompt.contains("question"));
            match self.0 {
                Ok(text) => Ok(LlmResponse {
                    content: text.to_string(),
                    model: request.model.clone(),
                    usage: LlmUsage::new(10, 2),
                }),
                Err(msg) => Err(AppError::Llm(msg.to_string())),
            }
        }
    }

    fn stage(snippets: Snippets, reply: Reply) -> DocumentStage {
        DocumentStage {
            retriever: Arc::new(snippets),
            llm: Arc::new(reply),
            prompt: default_prompt(),
            model: "phi3".to_string(),
            temperature: Some(0.0),
            top_k: 3,
            min_similarity: 0.5,
        }
    }

    #[tokio::test]
    async fn test_accepted_answer_with_unique_sources() {
        let snippets = Snippets(vec![
            ("Gallium melts at 29.76 C.", "metals.md", 20.0),
            ("Gallium is soft.", "metals.md", 40.0),
            ("Cesium melts at 28.5 C.", "alkali.md", 45.0),
        ]);
        let outcome = stage(snippets, Reply(Ok(" Gallium melts at 29.76 C. ")))
            .attempt("gallium melting point")
            .await
            .unwrap();

        match outcome {
            StageOutcome::Resolved(res) => {
                assert_eq!(res.answer, "Gallium melts at 29.76 C.");
                assert_eq!(res.sources, vec!["metals.md", "alkali.md"]);
                assert_eq!(res.found_in, FoundIn::Documents);
                assert!(res.context.contains("29.76 C.\n\nGallium is soft."));
            }
            StageOutcome::Unresolved => panic!("expected a resolution"),
        }
    }

    #[tokio::test]
    async fn test_evasive_answer_is_unresolved() {
        let snippets = Snippets(vec![("Gallium melts at 29.76 C.", "metals.md", 20.0)]);
        let outcome = stage(snippets, Reply(Ok("Not Found in Knowledge Base")))
            .attempt("gallium melting point")
            .await
            .unwrap();
        assert_eq!(outcome, StageOutcome::Unresolved);
    }

    #[tokio::test]
    async fn test_no_snippets_is_unresolved() {
        let outcome = stage(Snippets(vec![]), Reply(Ok("anything at all")))
            .attempt("what is diabetes")
            .await
            .unwrap();
        assert_eq!(outcome, StageOutcome::Unresolved);
    }

    #[tokio::test]
    async fn test_generator_failure_is_an_error() {
        let snippets = Snippets(vec![("Gallium melts at 29.76 C.", "metals.md", 20.0)]);
        let result = stage(snippets, Reply(Err("connection refused")))
            .attempt("gallium melting point")
            .await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_empty_chain_is_unresolved() {
        let stage = CalculationStage {
            chain: CalculationChain::default(),
        };
        assert_eq!(stage.attempt("9").await.unwrap(), StageOutcome::Unresolved);
        assert!(!stage.skips_computational());
    }
}
