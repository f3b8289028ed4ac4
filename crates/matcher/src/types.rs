use chrono::{DateTime, Utc};
use index::{DimensionMismatch, IndexStats, SearchError, SearchResult};
use semantic::{EmbedError, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One provider's index to search: which embedding model, which namespace,
/// which region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub provider: ProviderKind,
    pub namespace: String,
    pub region: String,
}

impl SearchTarget {
    pub fn new(
        provider: ProviderKind,
        namespace: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            namespace: namespace.into(),
            region: region.into(),
        }
    }

    /// Key of this target's outcome in a [`ComparisonResult`].
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Immutable description of a single comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub query: String,
    pub top_k: usize,
    pub targets: Vec<SearchTarget>,
    /// Upper bound for each job; `None` waits for every job to finish.
    #[serde(default, with = "optional_millis")]
    pub job_timeout: Option<Duration>,
}

impl RunRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            targets: Vec::new(),
            job_timeout: None,
        }
    }

    pub fn with_target(mut self, target: SearchTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    /// Contract checks performed before any I/O.
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.query.trim().is_empty() {
            return Err(CompareError::InvalidRequest("query text is blank".into()));
        }
        if self.targets.is_empty() {
            return Err(CompareError::InvalidRequest(
                "at least one search target is required".into(),
            ));
        }
        index::validate_top_k(self.top_k)
            .map_err(|e| CompareError::InvalidRequest(e.to_string()))?;
        if self.job_timeout == Some(Duration::ZERO) {
            return Err(CompareError::InvalidRequest(
                "job timeout must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.provider) {
                return Err(CompareError::InvalidRequest(format!(
                    "provider '{}' appears more than once",
                    target.provider
                )));
            }
            if target.namespace.trim().is_empty() {
                return Err(CompareError::InvalidRequest(format!(
                    "namespace for '{}' is blank",
                    target.provider
                )));
            }
            if target.region.trim().is_empty() {
                return Err(CompareError::InvalidRequest(format!(
                    "region for '{}' is blank",
                    target.provider
                )));
            }
        }
        Ok(())
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

/// Lifecycle of one provider job.
///
/// `Pending → Embedding → Searching → Completed`, with `Failed` reachable from
/// `Embedding` and `Searching`. Terminal states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Embedding,
    Searching,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Embedding)
                | (JobState::Embedding, JobState::Searching)
                | (JobState::Embedding, JobState::Failed)
                | (JobState::Searching, JobState::Completed)
                | (JobState::Searching, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Embedding => "embedding",
            JobState::Searching => "searching",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Request-level failures. Only these abort a run.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Classified failure of a single provider job.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("{message}")]
    RateLimitExceeded { message: String },
    #[error("embedding failed: {message}")]
    Embed { message: String },
    #[error("{0}")]
    DimensionMismatch(DimensionMismatch),
    #[error("search failed: {message}")]
    Search { message: String },
    #[error("job timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
    #[error("job aborted: {message}")]
    Aborted { message: String },
}

impl JobError {
    /// Short machine-readable tag, matching the serialized `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Configuration { .. } => "configuration",
            JobError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            JobError::Embed { .. } => "embed",
            JobError::DimensionMismatch(_) => "dimension_mismatch",
            JobError::Search { .. } => "search",
            JobError::TimedOut { .. } => "timed_out",
            JobError::Aborted { .. } => "aborted",
        }
    }
}

impl From<EmbedError> for JobError {
    fn from(err: EmbedError) -> Self {
        if err.is_configuration() {
            JobError::Configuration {
                message: match err {
                    EmbedError::Configuration(message) => message,
                    other => other.to_string(),
                },
            }
        } else if err.is_rate_limited() {
            JobError::RateLimitExceeded {
                message: err.to_string(),
            }
        } else {
            JobError::Embed {
                message: err.to_string(),
            }
        }
    }
}

impl From<SearchError> for JobError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::DimensionMismatch(mismatch) => JobError::DimensionMismatch(mismatch),
            other => JobError::Search {
                message: other.to_string(),
            },
        }
    }
}

/// Everything recorded for one target in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub target: SearchTarget,
    /// Length of the query vector, zero when embedding never succeeded.
    pub query_vector_dimension: usize,
    pub results: Vec<SearchResult>,
    /// Embed plus search time; zero for failed jobs.
    #[serde(rename = "elapsed_ms", with = "semantic::serde_millis")]
    pub elapsed: Duration,
    pub stats: IndexStats,
    pub state: JobState,
    pub error: Option<JobError>,
}

impl JobOutcome {
    pub fn failed(target: SearchTarget, query_vector_dimension: usize, error: JobError) -> Self {
        let stats = IndexStats::unknown(target.region.clone());
        Self {
            target,
            query_vector_dimension,
            results: Vec::new(),
            elapsed: Duration::ZERO,
            stats,
            state: JobState::Failed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// All outcomes of a run, keyed by provider name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub outcomes: BTreeMap<String, JobOutcome>,
}

impl ComparisonResult {
    pub fn get(&self, provider: &str) -> Option<&JobOutcome> {
        self.outcomes.get(provider)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobOutcome)> {
        self.outcomes.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&String, &JobError)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| outcome.error.as_ref().map(|err| (name, err)))
    }
}
