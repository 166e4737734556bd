//! The routing controller.
//!
//! Order of resolution: answer cache, then the configured stages (document
//! search, then calculation services), then the not-found sentinel. Every
//! outcome except a cache hit is written back to the cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;

use strictqa_core::{AppConfig, AppError, AppResult};
use strictqa_knowledge::{create_provider, DocumentRecord, DocumentRetriever, KnowledgeBase, SqliteIndex};
use strictqa_llm::{create_client, LlmClient};
use strictqa_prompt::{default_prompt, load_prompt, PromptDefinition, DEFAULT_PROMPT_ID};

use crate::cache::{CacheEntry, CacheStore, OperationRecord, SqliteCacheStore};
use crate::calculation::CalculationChain;
use crate::classifier::is_computational;
use crate::fingerprint::fingerprint;
use crate::result::{FoundIn, ResolutionResult, ServiceMeta};
use crate::stages::{CalculationStage, DocumentStage, Resolution, ResolutionStage, StageOutcome};

/// Answer returned when nothing resolves a question.
pub const NOT_FOUND_ANSWER: &str = "Not Found in Knowledge Base";

/// Cached context stored alongside [`NOT_FOUND_ANSWER`].
pub const NOT_FOUND_CONTEXT: &str = "Question outside Knowledge Base scope";

/// Cached sources containing this marker name a calculation service.
pub const SERVICE_MARKER: &str = "API";

/// Category reported for cached service answers stored without one.
const CACHED_SERVICE_CATEGORY: &str = "unknown";

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Read and write the answer cache
    pub use_cache: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub documents: usize,
    pub document_names: Vec<String>,
    pub cache_size: usize,
    pub documents_dir: PathBuf,
}

pub struct Router {
    cache: Arc<dyn CacheStore>,
    retriever: Arc<dyn DocumentRetriever>,
    stages: Vec<Arc<dyn ResolutionStage>>,
    documents_dir: PathBuf,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.ensure_state_dir()?;

        let cache = SqliteCacheStore::open(&config.cache_path())?;
        let index = SqliteIndex::open(&config.index_path())?;
        let embedder = create_provider(&config.embedding)?;
        let retriever = KnowledgeBase::new(
            config.documents_dir(),
            index,
            embedder,
            config.documents.chunk_size,
            config.documents.chunk_overlap,
        );
        let llm = create_client(&config.llm)?;
        let prompt = load_prompt(&config.workspace, DEFAULT_PROMPT_ID)?;
        let chain = CalculationChain::from_settings(&config.calculation)?;

        tracing::debug!(services = ?chain.labels(), "Calculation chain ready");

        Router::builder()
            .cache(Arc::new(cache))
            .retriever(Arc::new(retriever))
            .llm(llm)
            .prompt(prompt)
            .model(config.llm.model.clone())
            .temperature(config.llm.temperature)
            .top_k(config.documents.top_k)
            .min_similarity(config.documents.min_similarity)
            .chain(chain)
            .documents_dir(config.documents_dir())
            .build()
    }

    /// Resolve a question using the cache. Never fails.
    pub async fn resolve(&self, question: &str) -> ResolutionResult {
        self.resolve_with(question, ResolveOptions::default()).await
    }

    #[tracing::instrument(name = "resolve", skip(self, options), fields(use_cache = options.use_cache))]
    pub async fn resolve_with(&self, question: &str, options: ResolveOptions) -> ResolutionResult {
        let started = Instant::now();
        let key = fingerprint(question);

        if options.use_cache {
            match self.cache.get(&key) {
                Ok(Some(entry)) => {
                    tracing::info!("Answer found in cache");
                    let result = from_cache_entry(entry, started.elapsed());
                    self.record("cache_hit", question, started);
                    return result;
                }
                Ok(None) => {}
                Err(e) => tracing::error!("Cache read failed, treating as miss: {}", e),
            }
        }

        let computational = is_computational(question);
        if computational {
            tracing::info!("Computational question, skipping document search");
        }

        let mut resolution = None;
        for stage in &self.stages {
            if computational && stage.skips_computational() {
                continue;
            }
            match stage.attempt(question).await {
                Ok(StageOutcome::Resolved(found)) => {
                    resolution = Some(found);
                    break;
                }
                Ok(StageOutcome::Unresolved) => {
                    tracing::debug!(stage = stage.name(), "Stage did not resolve")
                }
                Err(e) => tracing::warn!(stage = stage.name(), "Stage failed: {}", e),
            }
        }

        let resolution = resolution.unwrap_or_else(|| {
            tracing::info!("No backend answered");
            Resolution {
                answer: NOT_FOUND_ANSWER.to_string(),
                context: NOT_FOUND_CONTEXT.to_string(),
                sources: vec![],
                found_in: FoundIn::None,
                service: None,
            }
        });

        if options.use_cache {
            let entry = CacheEntry {
                fingerprint: key,
                question: question.to_string(),
                answer: resolution.answer.clone(),
                context: resolution.context.clone(),
                sources: resolution.sources.clone(),
                category: resolution.service.as_ref().map(|s| s.category.clone()),
                created_at: Utc::now(),
            };
            if let Err(e) = self.cache.upsert(&entry) {
                tracing::error!("Cache write failed: {}", e);
            }
        }

        self.record(&format!("resolve_{}", resolution.found_in), question, started);

        ResolutionResult {
            answer: resolution.answer,
            sources: resolution.sources,
            cached: false,
            elapsed: started.elapsed(),
            found_in: resolution.found_in,
            service: resolution.service,
            cached_at: None,
        }
    }

    /// Resolve with a caller-side deadline. Nothing is cached for an
    /// attempt that times out.
    pub async fn resolve_within(&self, question: &str, timeout: Duration) -> AppResult<ResolutionResult> {
        tokio::time::timeout(timeout, self.resolve(question))
            .await
            .map_err(|_| AppError::Timeout(format!("resolution exceeded {}s", timeout.as_secs_f64())))
    }

    pub fn status(&self) -> AppResult<RouterStatus> {
        let records = self.retriever.documents()?;
        Ok(RouterStatus {
            documents: records.len(),
            document_names: records.into_iter().map(|r| r.name).collect(),
            cache_size: self.cache.len()?,
            documents_dir: self.documents_dir.clone(),
        })
    }

    /// Index files added to the documents folder. Returns the number of new
    /// documents.
    pub async fn scan_documents(&self) -> AppResult<usize> {
        let started = Instant::now();
        let added = self.retriever.scan().await?;
        self.record("scan", &format!("{} new documents", added), started);
        Ok(added)
    }

    pub fn list_documents(&self) -> AppResult<Vec<DocumentRecord>> {
        self.retriever.documents()
    }

    pub fn clear_cache(&self) -> AppResult<usize> {
        self.cache.clear()
    }

    fn record(&self, operation: &str, details: &str, started: Instant) {
        let record = OperationRecord::new(operation, details, started.elapsed().as_secs_f64());
        if let Err(e) = self.cache.record_operation(&record) {
            tracing::warn!("Failed to record operation: {}", e);
        }
    }
}

fn from_cache_entry(entry: CacheEntry, elapsed: Duration) -> ResolutionResult {
    let service_source = entry.sources.iter().find(|s| s.contains(SERVICE_MARKER)).cloned();

    let found_in = if service_source.is_some() {
        FoundIn::CalculationService
    } else if entry.answer == NOT_FOUND_ANSWER && entry.sources.is_empty() {
        FoundIn::None
    } else if !entry.sources.is_empty() {
        FoundIn::Documents
    } else {
        FoundIn::Cache
    };

    ResolutionResult {
        answer: entry.answer,
        sources: entry.sources,
        cached: true,
        elapsed,
        found_in,
        service: service_source.map(|label| ServiceMeta {
            label,
            category: entry
                .category
                .unwrap_or_else(|| CACHED_SERVICE_CATEGORY.to_string()),
        }),
        cached_at: Some(entry.created_at),
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    cache: Option<Arc<dyn CacheStore>>,
    retriever: Option<Arc<dyn DocumentRetriever>>,
    llm: Option<Arc<dyn LlmClient>>,
    prompt: Option<PromptDefinition>,
    model: Option<String>,
    temperature: Option<f32>,
    top_k: Option<usize>,
    min_similarity: Option<f32>,
    chain: CalculationChain,
    documents_dir: PathBuf,
}

impl RouterBuilder {
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn DocumentRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Defaults to the built-in strict document prompt.
    pub fn prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }

    pub fn chain(mut self, chain: CalculationChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn documents_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.documents_dir = dir.into();
        self
    }

    pub fn build(self) -> AppResult<Router> {
        let cache = self
            .cache
            .ok_or_else(|| AppError::Config("Router requires a cache store".to_string()))?;
        let retriever = self
            .retriever
            .ok_or_else(|| AppError::Config("Router requires a document retriever".to_string()))?;
        let llm = self
            .llm
            .ok_or_else(|| AppError::Config("Router requires an answer generator".to_string()))?;

        let documents = DocumentStage {
            retriever: retriever.clone(),
            llm,
            prompt: self.prompt.unwrap_or_else(default_prompt),
            model: self.model.unwrap_or_else(|| "phi3".to_string()),
            temperature: self.temperature,
            top_k: self.top_k.unwrap_or(3),
            min_similarity: self.min_similarity.unwrap_or(0.5),
        };
        let calculation = CalculationStage { chain: self.chain };

        Ok(Router {
            cache,
            retriever,
            stages: vec![Arc::new(documents), Arc::new(calculation)],
            documents_dir: self.documents_dir,
        })
    }
}
