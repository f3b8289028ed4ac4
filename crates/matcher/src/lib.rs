//! # Comparison engine (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` runs one query against several embedding providers at once. Each
//! provider gets its own job: build the provider's client (`semantic`), embed
//! the query, search that provider's namespace through the index client
//! (`index`) and record timing, rows and stats. Jobs run concurrently and fail
//! independently; the caller always gets one [`JobOutcome`] per target.
//!
//! ## Core Types
//!
//! - [`RunRequest`]: query, `top_k`, one [`SearchTarget`] per provider and an
//!   optional per-job timeout. Validated before any I/O.
//! - [`ComparisonOrchestrator`]: drives the jobs.
//! - [`JobState`]: `Pending → Embedding → Searching → Completed | Failed`.
//! - [`JobError`]: classified per-job failure (rate limit, dimension mismatch,
//!   configuration, search, timeout).
//! - [`ComparisonResult`]: outcomes keyed by provider name.
//! - [`scoring`]: distance tiers, summaries and the best performer.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use index::{TurbopufferClient, TurbopufferConfig};
//! use matcher::{ComparisonOrchestrator, RunRequest, SearchTarget};
//! use semantic::{EnvCredentials, ProviderKind, ProviderRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let embedders = Arc::new(ProviderRegistry::new(Arc::new(EnvCredentials)));
//! let index = Arc::new(TurbopufferClient::new(TurbopufferConfig::new("tpuf_key"))?);
//! let orchestrator = ComparisonOrchestrator::new(embedders, index);
//!
//! let request = RunRequest::new("registered nurse", 10)
//!     .with_target(SearchTarget::new(ProviderKind::Vertex, "titles-vertex", "aws-eu-west-1"))
//!     .with_target(SearchTarget::new(ProviderKind::OpenAiSmall, "titles-openai", "aws-eu-west-1"));
//!
//! let result = orchestrator.run(request).await?;
//! for (provider, outcome) in result.iter() {
//!     println!("{provider}: {} rows in {:?}", outcome.results.len(), outcome.elapsed);
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
pub mod metrics;
pub mod scoring;
mod types;

pub use crate::engine::ComparisonOrchestrator;
pub use crate::metrics::CompareMetrics;
pub use crate::scoring::{
    best_performer, classify, summarize, summarize_distances, summary_table, DistanceSummary,
    ProviderSummary, ScoreTier, EMPTY_DISTANCE_SENTINEL,
};
pub use crate::types::{
    CompareError, ComparisonResult, JobError, JobOutcome, JobState, RunRequest, SearchTarget,
};
