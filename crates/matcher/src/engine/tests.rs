use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use index::{validate_search, SearchError};
use semantic::{EmbedError, EmbeddingClient, ProviderIdentity, ProviderKind, StubEmbeddingClient};

use crate::types::JobError;

const REGION: &str = "aws-eu-west-1";

#[derive(Clone)]
enum Behavior {
    Ok,
    Unconfigured,
    HttpError(u16),
    RateLimited,
    SlowThenOk(Duration),
    SlowThenFail(Duration),
    Panics,
}

struct ScriptedFactory {
    behaviors: HashMap<ProviderKind, Behavior>,
    initialized: AtomicUsize,
}

impl ScriptedFactory {
    fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            initialized: AtomicUsize::new(0),
        }
    }

    fn with(mut self, kind: ProviderKind, behavior: Behavior) -> Self {
        self.behaviors.insert(kind, behavior);
        self
    }
}

#[async_trait]
impl EmbeddingClientFactory for ScriptedFactory {
    async fn initialize(&self, kind: ProviderKind) -> Result<Arc<dyn EmbeddingClient>, EmbedError> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behaviors.get(&kind).cloned().unwrap_or(Behavior::Ok);
        match behavior {
            Behavior::Unconfigured => Err(EmbedError::Configuration(format!(
                "{kind} credentials missing"
            ))),
            Behavior::Panics => panic!("provider client exploded"),
            other => Ok(Arc::new(ScriptedClient {
                inner: StubEmbeddingClient::new(kind),
                behavior: other,
            })),
        }
    }
}

struct ScriptedClient {
    inner: StubEmbeddingClient,
    behavior: Behavior,
}

#[async_trait]
impl EmbeddingClient for ScriptedClient {
    fn identity(&self) -> &ProviderIdentity {
        self.inner.identity()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        match &self.behavior {
            Behavior::HttpError(status) => Err(EmbedError::Http {
                status: *status,
                body: "provider error".into(),
            }),
            Behavior::RateLimited => Err(EmbedError::RateLimitExceeded {
                provider: self.identity().name.clone(),
                attempts: 3,
                message: "Vertex AI rate limit exceeded".into(),
            }),
            Behavior::SlowThenOk(delay) => {
                tokio::time::sleep(*delay).await;
                self.inner.embed(text).await
            }
            Behavior::SlowThenFail(delay) => {
                tokio::time::sleep(*delay).await;
                Err(EmbedError::Http {
                    status: 503,
                    body: "unavailable".into(),
                })
            }
            _ => self.inner.embed(text).await,
        }
    }
}

/// In-process stand-in for the remote index: each namespace has a fixed
/// dimension and returns up to three rows.
struct FakeIndex {
    dimensions: HashMap<String, usize>,
    searches: AtomicUsize,
    stats_delay: Option<Duration>,
}

impl FakeIndex {
    fn new() -> Self {
        let dimensions = ProviderKind::ALL
            .iter()
            .map(|kind| (namespace(*kind), kind.default_dimension()))
            .collect();
        Self {
            dimensions,
            searches: AtomicUsize::new(0),
            stats_delay: None,
        }
    }

    fn with_stats_delay(mut self, delay: Duration) -> Self {
        self.stats_delay = Some(delay);
        self
    }
}

#[async_trait]
impl VectorIndexClient for FakeIndex {
    async fn search(
        &self,
        namespace: &str,
        region: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        validate_search(namespace, region, vector, top_k)?;
        self.searches.fetch_add(1, Ordering::SeqCst);
        let Some(&dimension) = self.dimensions.get(namespace) else {
            return Err(SearchError::from_remote(Some(404), "namespace not found"));
        };
        if vector.len() != dimension {
            return Err(SearchError::from_remote(
                Some(400),
                format!(
                    "Query has dimensions={} but index has dimensions={dimension}",
                    vector.len()
                ),
            ));
        }
        Ok((0..top_k.min(3))
            .map(|i| SearchResult {
                id: format!("{namespace}-{i}"),
                text: format!("row {i}"),
                distance: 0.1 * (i as f64 + 1.0),
            })
            .collect())
    }

    async fn stats(&self, namespace: &str, region: &str) -> IndexStats {
        if let Some(delay) = self.stats_delay {
            tokio::time::sleep(delay).await;
        }
        IndexStats {
            approx_item_count: 100,
            dimensions: self.dimensions.get(namespace).copied().unwrap_or(0),
            region: region.to_string(),
        }
    }
}

#[derive(Default)]
struct RecordingMetrics {
    transitions: Mutex<Vec<(String, JobState, JobState)>>,
    jobs: Mutex<Vec<(String, JobState, Instant)>>,
}

impl CompareMetrics for RecordingMetrics {
    fn record_transition(&self, provider: &str, from: JobState, to: JobState) {
        self.transitions
            .lock()
            .unwrap()
            .push((provider.to_string(), from, to));
    }

    fn record_job(&self, provider: &str, state: JobState, _latency: Duration, _count: usize) {
        self.jobs
            .lock()
            .unwrap()
            .push((provider.to_string(), state, Instant::now()));
    }
}

impl RecordingMetrics {
    fn transitions_for(&self, provider: &str) -> Vec<(JobState, JobState)> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == provider)
            .map(|(_, from, to)| (*from, *to))
            .collect()
    }

    fn finished_at(&self, provider: &str) -> Instant {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _, _)| name == provider)
            .map(|(_, _, at)| *at)
            .unwrap()
    }
}

fn namespace(kind: ProviderKind) -> String {
    format!("titles-{kind}")
}

fn target(kind: ProviderKind) -> SearchTarget {
    SearchTarget::new(kind, namespace(kind), REGION)
}

fn request(kinds: &[ProviderKind]) -> RunRequest {
    kinds
        .iter()
        .fold(RunRequest::new("software engineer", 10), |req, kind| {
            req.with_target(target(*kind))
        })
}

fn orchestrator(factory: ScriptedFactory) -> ComparisonOrchestrator {
    ComparisonOrchestrator::new(Arc::new(factory), Arc::new(FakeIndex::new()))
}

#[tokio::test]
async fn one_outcome_per_target_for_one_to_four_providers() {
    for n in 1..=ProviderKind::ALL.len() {
        let kinds = &ProviderKind::ALL[..n];
        let factory = ScriptedFactory::new()
            .with(ProviderKind::Voyage, Behavior::Unconfigured)
            .with(ProviderKind::OpenAiLarge, Behavior::HttpError(500));

        let result = orchestrator(factory).run(request(kinds)).await.unwrap();

        assert_eq!(result.len(), n);
        for kind in kinds {
            assert!(result.get(kind.name()).is_some(), "missing outcome for {kind}");
        }
    }
}

#[tokio::test]
async fn successful_job_records_results_and_stats() {
    let result = orchestrator(ScriptedFactory::new())
        .run(request(&[ProviderKind::Vertex]))
        .await
        .unwrap();

    assert_eq!(result.query, "software engineer");
    let outcome = result.get("vertex").unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.query_vector_dimension, 768);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.results[0].id, "titles-vertex-0");
    assert_eq!(outcome.stats.dimensions, 768);
    assert_eq!(outcome.stats.approx_item_count, 100);
}

#[tokio::test(start_paused = true)]
async fn elapsed_time_covers_embedding() {
    let factory =
        ScriptedFactory::new().with(ProviderKind::Voyage, Behavior::SlowThenOk(Duration::from_millis(250)));
    let result = orchestrator(factory)
        .run(request(&[ProviderKind::Voyage]))
        .await
        .unwrap();
    let outcome = result.get("voyage").unwrap();
    assert!(outcome.elapsed >= Duration::from_millis(250));
}

#[tokio::test]
async fn every_job_failing_still_yields_outcomes() {
    let factory = ProviderKind::ALL
        .iter()
        .fold(ScriptedFactory::new(), |f, kind| f.with(*kind, Behavior::Unconfigured));
    let result = orchestrator(factory)
        .run(request(&ProviderKind::ALL))
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    for (_, outcome) in result.iter() {
        assert_eq!(outcome.state, JobState::Failed);
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(outcome.query_vector_dimension, 0);
        assert!(matches!(outcome.error, Some(JobError::Configuration { .. })));
    }
    assert_eq!(result.failures().count(), 4);
}

#[tokio::test]
async fn dimension_mismatch_is_diagnosed() {
    // voyage (1024d) pointed at the vertex namespace (768d)
    let request = RunRequest::new("nurse", 5).with_target(SearchTarget::new(
        ProviderKind::Voyage,
        namespace(ProviderKind::Vertex),
        REGION,
    ));
    let result = orchestrator(ScriptedFactory::new()).run(request).await.unwrap();

    let outcome = result.get("voyage").unwrap();
    assert_eq!(outcome.query_vector_dimension, 1024);
    match &outcome.error {
        Some(JobError::DimensionMismatch(m)) => {
            assert_eq!(m.query_dimension, 1024);
            assert_eq!(m.index_dimension, 768);
            assert_eq!(m.index_model, "Vertex AI (text-multilingual-embedding-002)");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(outcome.stats, IndexStats::unknown(REGION));
}

#[tokio::test]
async fn embed_failures_are_classified() {
    let factory = ScriptedFactory::new()
        .with(ProviderKind::Vertex, Behavior::RateLimited)
        .with(ProviderKind::OpenAiSmall, Behavior::HttpError(429))
        .with(ProviderKind::OpenAiLarge, Behavior::HttpError(500));
    let result = orchestrator(factory)
        .run(request(&[
            ProviderKind::Vertex,
            ProviderKind::OpenAiSmall,
            ProviderKind::OpenAiLarge,
        ]))
        .await
        .unwrap();

    let kind = |name: &str| result.get(name).unwrap().error.as_ref().unwrap().kind();
    assert_eq!(kind("vertex"), "rate_limit_exceeded");
    assert_eq!(kind("openai-small"), "rate_limit_exceeded");
    assert_eq!(kind("openai-large"), "embed");
    assert_eq!(
        result.get("vertex").unwrap().error.as_ref().unwrap().to_string(),
        "Vertex AI rate limit exceeded"
    );
}

#[tokio::test]
async fn invalid_request_fails_before_any_io() {
    let factory = Arc::new(ScriptedFactory::new());
    let index = Arc::new(FakeIndex::new());
    let orchestrator = ComparisonOrchestrator::new(factory.clone(), index.clone());

    for top_k in [0, 1001] {
        let mut req = request(&[ProviderKind::Vertex]);
        req.top_k = top_k;
        assert!(matches!(
            orchestrator.run(req).await,
            Err(CompareError::InvalidRequest(_))
        ));
    }
    let duplicate = request(&[ProviderKind::Voyage, ProviderKind::Voyage]);
    assert!(orchestrator.run(duplicate).await.is_err());
    assert!(orchestrator.run(request(&[])).await.is_err());

    assert_eq!(factory.initialized.load(Ordering::SeqCst), 0);
    assert_eq!(index.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_failure_does_not_delay_other_jobs() {
    let factory = ScriptedFactory::new().with(
        ProviderKind::Vertex,
        Behavior::SlowThenFail(Duration::from_secs(30)),
    );
    let metrics = Arc::new(RecordingMetrics::default());
    let orchestrator = orchestrator(factory).with_metrics(metrics.clone());

    let started = Instant::now();
    let result = orchestrator
        .run(request(&[ProviderKind::Vertex, ProviderKind::OpenAiSmall]))
        .await
        .unwrap();

    assert!(result.get("openai-small").unwrap().is_success());
    assert!(!result.get("vertex").unwrap().is_success());
    assert!(metrics.finished_at("openai-small") - started < Duration::from_secs(1));
    assert!(metrics.finished_at("vertex") - started >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn job_timeout_only_affects_the_slow_job() {
    let factory = ScriptedFactory::new().with(
        ProviderKind::Vertex,
        Behavior::SlowThenOk(Duration::from_secs(10)),
    );
    let req = request(&[ProviderKind::Vertex, ProviderKind::Voyage])
        .with_job_timeout(Duration::from_secs(1));

    let result = orchestrator(factory).run(req).await.unwrap();

    assert_eq!(
        result.get("vertex").unwrap().error,
        Some(JobError::TimedOut { after_ms: 1000 })
    );
    assert!(result.get("voyage").unwrap().is_success());
}

#[tokio::test(start_paused = true)]
async fn stats_only_get_the_time_left_in_the_job_deadline() {
    let factory = ScriptedFactory::new().with(
        ProviderKind::Vertex,
        Behavior::SlowThenOk(Duration::from_millis(800)),
    );
    let index = FakeIndex::new().with_stats_delay(Duration::from_secs(5));
    let orchestrator = ComparisonOrchestrator::new(Arc::new(factory), Arc::new(index));
    let req = request(&[ProviderKind::Vertex]).with_job_timeout(Duration::from_secs(1));

    let started = Instant::now();
    let result = orchestrator.run(req).await.unwrap();
    let took = started.elapsed();

    let vertex = result.get("vertex").unwrap();
    assert!(vertex.is_success());
    assert_eq!(vertex.stats, IndexStats::unknown(REGION));
    assert!(took <= Duration::from_millis(1010), "run took {took:?}");
}

#[tokio::test]
async fn panicking_job_is_recorded_as_aborted() {
    let factory = ScriptedFactory::new().with(ProviderKind::OpenAiLarge, Behavior::Panics);
    let result = orchestrator(factory)
        .run(request(&[ProviderKind::OpenAiLarge, ProviderKind::Voyage]))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    let aborted = result.get("openai-large").unwrap();
    assert!(matches!(aborted.error, Some(JobError::Aborted { .. })));
    assert_eq!(aborted.state, JobState::Failed);
    assert!(result.get("voyage").unwrap().is_success());
}

#[tokio::test]
async fn metrics_observe_state_transitions() {
    let factory = ScriptedFactory::new().with(ProviderKind::Voyage, Behavior::Unconfigured);
    let metrics = Arc::new(RecordingMetrics::default());
    orchestrator(factory)
        .with_metrics(metrics.clone())
        .run(request(&[ProviderKind::Vertex, ProviderKind::Voyage]))
        .await
        .unwrap();

    assert_eq!(
        metrics.transitions_for("vertex"),
        vec![
            (JobState::Pending, JobState::Embedding),
            (JobState::Embedding, JobState::Searching),
            (JobState::Searching, JobState::Completed),
        ]
    );
    assert_eq!(
        metrics.transitions_for("voyage"),
        vec![
            (JobState::Pending, JobState::Embedding),
            (JobState::Embedding, JobState::Failed),
        ]
    );
}

#[tokio::test]
async fn vectors_never_cross_providers() {
    let result = orchestrator(ScriptedFactory::new())
        .run(request(&ProviderKind::ALL))
        .await
        .unwrap();
    for (name, outcome) in result.iter() {
        assert!(outcome.is_success(), "{name} failed: {:?}", outcome.error);
        assert_eq!(
            outcome.query_vector_dimension,
            outcome.target.provider.default_dimension()
        );
        assert!(outcome.results[0].id.starts_with(&outcome.target.namespace));
    }
}
