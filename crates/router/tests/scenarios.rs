//! End-to-end resolution against the real calculation services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strictqa_core::config::CalculationServiceSettings;
use strictqa_core::{AppError, AppResult};
use strictqa_knowledge::embeddings::providers::trigram::TrigramProvider;
use strictqa_knowledge::{DocumentRecord, DocumentRetriever, KnowledgeBase, RetrievedSnippet, SqliteIndex};
use strictqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use strictqa_router::{
    fingerprint, CacheStore, CalculationChain, CalculationOutcome, CalculationService, FoundIn,
    HttpCalculationService, Router, SqliteCacheStore, NOT_FOUND_ANSWER,
};
use tempfile::TempDir;

async fn spawn(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Counts searches made against the wrapped knowledge base.
struct Counted {
    inner: KnowledgeBase,
    searches: AtomicUsize,
}

#[async_trait::async_trait]
impl DocumentRetriever for Counted {
    async fn search(&self, question: &str, k: usize) -> AppResult<Vec<RetrievedSnippet>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(question, k).await
    }

    fn document_count(&self) -> AppResult<usize> {
        self.inner.document_count()
    }

    fn documents(&self) -> AppResult<Vec<DocumentRecord>> {
        self.inner.documents()
    }

    async fn scan(&self) -> AppResult<usize> {
        self.inner.scan().await
    }
}

/// Generator that refuses everything, as a strict model would on unrelated
/// context.
struct Refusing {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LlmClient for Refusing {
    fn provider_name(&self) -> &str {
        "refusing"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: NOT_FOUND_ANSWER.to_string(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

struct Scenario {
    router: Router,
    cache: Arc<SqliteCacheStore>,
    retriever: Arc<Counted>,
    llm: Arc<Refusing>,
    _dir: TempDir,
}

fn service(label: &str, url: &str, path: &str, category: &str) -> Arc<dyn CalculationService> {
    let settings = CalculationServiceSettings {
        label: label.to_string(),
        url: url.to_string(),
        path: path.to_string(),
        default_category: category.to_string(),
    };
    Arc::new(HttpCalculationService::new(&settings, Duration::from_secs(5)).unwrap())
}

async fn scenario(extra_services: Vec<Arc<dyn CalculationService>>) -> Scenario {
    let factorization = spawn(strictqa_calc::factorization_router()).await;
    let math = spawn(strictqa_calc::math_router()).await;

    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("documents");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(
        docs.join("metals.md"),
        "# Metals\n\nGallium melts at 29.76 degrees Celsius.",
    )
    .unwrap();

    let knowledge = KnowledgeBase::new(
        &docs,
        SqliteIndex::open_in_memory().unwrap(),
        Arc::new(TrigramProvider::new(384)),
        700,
        100,
    );
    knowledge.scan().await.unwrap();

    let retriever = Arc::new(Counted {
        inner: knowledge,
        searches: AtomicUsize::new(0),
    });
    let llm = Arc::new(Refusing {
        calls: AtomicUsize::new(0),
    });

    let mut services = extra_services;
    services.push(service("Factorization API", &factorization, "/factors", "factorization"));
    services.push(service("Math API", &math, "/calculate", "unknown"));

    let cache = Arc::new(SqliteCacheStore::open(&dir.path().join("cache.sqlite")).unwrap());
    let router = Router::builder()
        .cache(cache.clone())
        .retriever(retriever.clone())
        .llm(llm.clone())
        .chain(CalculationChain::new(services))
        .documents_dir(&docs)
        .build()
        .unwrap();

    Scenario {
        router,
        cache,
        retriever,
        llm,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_bare_number_is_factorized() {
    let s = scenario(vec![]).await;

    let result = s.router.resolve("9").await;
    assert_eq!(result.answer, "Factors of 9: [1, 3, 9]");
    assert_eq!(result.found_in, FoundIn::CalculationService);
    assert_eq!(result.sources, vec!["Factorization API"]);
    let meta = result.service.unwrap();
    assert_eq!(meta.label, "Factorization API");
    assert_eq!(meta.category, "factorization");
    assert_eq!(s.retriever.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fibonacci_goes_to_math() {
    let s = scenario(vec![]).await;

    let result = s.router.resolve("fibonacci 5").await;
    assert_eq!(result.answer, "The 5th Fibonacci number is 3");
    assert_eq!(result.found_in, FoundIn::CalculationService);
    assert_eq!(result.service.unwrap().category, "fibonacci_nth");
    assert_eq!(s.retriever.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_topic_is_cached_sentinel() {
    let s = scenario(vec![]).await;

    let first = s.router.resolve("what is diabetes").await;
    assert_eq!(first.answer, NOT_FOUND_ANSWER);
    assert_eq!(first.found_in, FoundIn::None);
    assert!(!first.cached);
    assert_eq!(s.retriever.searches.load(Ordering::SeqCst), 1);
    let llm_calls = s.llm.calls.load(Ordering::SeqCst);

    let second = s.router.resolve("What is   diabetes").await;
    assert!(second.cached);
    assert_eq!(second.answer, NOT_FOUND_ANSWER);
    assert_eq!(second.found_in, FoundIn::None);
    assert_eq!(s.retriever.searches.load(Ordering::SeqCst), 1);
    assert_eq!(s.llm.calls.load(Ordering::SeqCst), llm_calls);
}

#[tokio::test]
async fn test_unreachable_service_is_skipped() {
    // Bind then drop so the port refuses connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let s = scenario(vec![service("Offline API", &dead, "/calculate", "unknown")]).await;

    let result = s.router.resolve("factors of 46").await;
    assert_eq!(result.answer, "Factors of 46: [1, 2, 23, 46]");
    assert_eq!(result.service.unwrap().label, "Factorization API");
}

#[tokio::test]
async fn test_math_answers_after_factorization_declines() {
    let s = scenario(vec![]).await;

    let result = s.router.resolve("calculate 6 * 7").await;
    assert_eq!(result.found_in, FoundIn::CalculationService);
    assert_eq!(result.service.unwrap().label, "Math API");
    assert!(result.answer.contains("42"));
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let s = scenario(vec![]).await;

    let first = s.router.resolve("factorize 64").await;
    let second = s.router.resolve("factorize 64").await;
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.answer, second.answer);
    assert_eq!(second.found_in, FoundIn::CalculationService);
    assert_eq!(second.service.unwrap().category, "factorization");
    assert_eq!(s.router.status().unwrap().cache_size, 1);
}

/// Answers eventually, long after any reasonable deadline.
struct Stalled;

#[async_trait::async_trait]
impl CalculationService for Stalled {
    fn label(&self) -> &str {
        "Stalled API"
    }

    async fn evaluate(&self, _question: &str) -> AppResult<CalculationOutcome> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(CalculationOutcome {
            found: true,
            answer: "too late".to_string(),
            label: "Stalled API".to_string(),
            category: "unknown".to_string(),
        })
    }
}

#[tokio::test]
async fn test_timed_out_attempt_is_not_cached() {
    let s = scenario(vec![Arc::new(Stalled)]).await;

    let result = s
        .router
        .resolve_within("fibonacci 10", Duration::from_millis(200))
        .await;
    assert!(matches!(result, Err(AppError::Timeout(_))));
    assert!(s.cache.get(&fingerprint("fibonacci 10")).unwrap().is_none());
    assert_eq!(s.cache.len().unwrap(), 0);
}
