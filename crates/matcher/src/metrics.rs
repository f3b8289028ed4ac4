// Metrics hooks for the comparison engine.
//
// An observer is handed to `ComparisonOrchestrator::with_metrics`; the
// orchestrator reports every job state transition plus the final latency and
// result count. Nothing here is global.
use std::time::Duration;

use crate::types::JobState;

/// Observer for comparison jobs.
pub trait CompareMetrics: Send + Sync {
    /// A job moved from `from` to `to`.
    fn record_transition(&self, _provider: &str, _from: JobState, _to: JobState) {}

    /// A job reached a terminal `state`.
    ///
    /// `latency` is the embed plus search time (zero for failed jobs) and
    /// `result_count` the number of rows returned.
    fn record_job(&self, provider: &str, state: JobState, latency: Duration, result_count: usize);
}
