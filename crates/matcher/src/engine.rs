use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use index::{IndexStats, SearchResult, VectorIndexClient};
use semantic::EmbeddingClientFactory;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, info_span, warn, Instrument};

use crate::metrics::CompareMetrics;
use crate::types::{
    CompareError, ComparisonResult, JobError, JobOutcome, JobState, RunRequest, SearchTarget,
};

#[cfg(test)]
mod tests;

/// Fans one query out to every target, embedding and searching per provider
/// concurrently, and collects exactly one [`JobOutcome`] per target.
pub struct ComparisonOrchestrator {
    embedders: Arc<dyn EmbeddingClientFactory>,
    index: Arc<dyn VectorIndexClient>,
    metrics: Option<Arc<dyn CompareMetrics>>,
}

impl ComparisonOrchestrator {
    pub fn new(
        embedders: Arc<dyn EmbeddingClientFactory>,
        index: Arc<dyn VectorIndexClient>,
    ) -> Self {
        Self {
            embedders,
            index,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn CompareMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run every job in `request` and wait for all of them.
    ///
    /// Only request validation can fail the whole run; per-provider failures
    /// land in that provider's outcome.
    pub async fn run(&self, request: RunRequest) -> Result<ComparisonResult, CompareError> {
        request.validate()?;

        let RunRequest {
            query,
            top_k,
            targets,
            job_timeout,
        } = request;
        let query: Arc<str> = Arc::from(query);
        let timestamp = Utc::now();

        let handles: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let span = info_span!(
                    "compare.job",
                    provider = %target.provider,
                    namespace = %target.namespace,
                    region = %target.region,
                );
                let job = Job {
                    embedders: Arc::clone(&self.embedders),
                    index: Arc::clone(&self.index),
                    metrics: self.metrics.clone(),
                    query: Arc::clone(&query),
                    target: target.clone(),
                    top_k,
                    job_timeout,
                };
                (target, tokio::spawn(job.run().instrument(span)))
            })
            .collect();

        let mut outcomes = BTreeMap::new();
        for (target, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    warn!(
                        event = "job_failed",
                        provider = %target.provider,
                        error = %join_error,
                        "job aborted"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_job(
                            target.provider_name(),
                            JobState::Failed,
                            Duration::ZERO,
                            0,
                        );
                    }
                    JobOutcome::failed(
                        target.clone(),
                        0,
                        JobError::Aborted {
                            message: join_error.to_string(),
                        },
                    )
                }
            };
            outcomes.insert(target.provider_name().to_string(), outcome);
        }

        Ok(ComparisonResult {
            query: query.to_string(),
            timestamp,
            outcomes,
        })
    }
}

/// Tracks a job's state and forwards transitions to the observer.
struct Progress {
    provider: &'static str,
    state: JobState,
    query_dimension: usize,
    metrics: Option<Arc<dyn CompareMetrics>>,
}

impl Progress {
    fn advance(&mut self, next: JobState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "ignoring invalid job transition");
            return;
        }
        let from = std::mem::replace(&mut self.state, next);
        if let Some(metrics) = &self.metrics {
            metrics.record_transition(self.provider, from, next);
        }
    }
}

struct Job {
    embedders: Arc<dyn EmbeddingClientFactory>,
    index: Arc<dyn VectorIndexClient>,
    metrics: Option<Arc<dyn CompareMetrics>>,
    query: Arc<str>,
    target: SearchTarget,
    top_k: usize,
    job_timeout: Option<Duration>,
}

impl Job {
    async fn run(self) -> JobOutcome {
        let mut progress = Progress {
            provider: self.target.provider_name(),
            state: JobState::Pending,
            query_dimension: 0,
            metrics: self.metrics.clone(),
        };

        let started = Instant::now();
        let result = match self.job_timeout {
            Some(limit) => match timeout(limit, self.pipeline(&mut progress)).await {
                Ok(result) => result,
                Err(_) => Err(JobError::TimedOut {
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => self.pipeline(&mut progress).await,
        };

        match result {
            Ok(results) => {
                let elapsed = started.elapsed();
                progress.advance(JobState::Completed);
                let deadline = self.job_timeout.map(|limit| started + limit);
                let stats = self.fetch_stats(deadline).await;
                info!(
                    event = "job_completed",
                    results = results.len(),
                    dimension = progress.query_dimension,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "job completed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_job(
                        progress.provider,
                        JobState::Completed,
                        elapsed,
                        results.len(),
                    );
                }
                JobOutcome {
                    target: self.target,
                    query_vector_dimension: progress.query_dimension,
                    results,
                    elapsed,
                    stats,
                    state: JobState::Completed,
                    error: None,
                }
            }
            Err(error) => {
                if progress.state == JobState::Pending {
                    progress.advance(JobState::Embedding);
                }
                progress.advance(JobState::Failed);
                warn!(
                    event = "job_failed",
                    kind = error.kind(),
                    error = %error,
                    "job failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_job(progress.provider, JobState::Failed, Duration::ZERO, 0);
                }
                JobOutcome::failed(self.target, progress.query_dimension, error)
            }
        }
    }

    async fn pipeline(&self, progress: &mut Progress) -> Result<Vec<SearchResult>, JobError> {
        progress.advance(JobState::Embedding);
        let client = self.embedders.initialize(self.target.provider).await?;
        let vector = client.embed(&self.query).await?;
        progress.query_dimension = vector.len();

        progress.advance(JobState::Searching);
        let results = self
            .index
            .search(
                &self.target.namespace,
                &self.target.region,
                &vector,
                self.top_k,
            )
            .await?;
        Ok(results)
    }

    /// Stats share the job's deadline; whatever the pipeline left is all they get.
    async fn fetch_stats(&self, deadline: Option<Instant>) -> IndexStats {
        let stats = self.index.stats(&self.target.namespace, &self.target.region);
        match deadline {
            Some(deadline) => timeout_at(deadline, stats)
                .await
                .unwrap_or_else(|_| IndexStats::unknown(self.target.region.clone())),
            None => stats.await,
        }
    }
}
