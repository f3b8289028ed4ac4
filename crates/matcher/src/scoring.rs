//! Distance tiers and per-provider summary statistics.

use index::SearchResult;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ComparisonResult;

/// Reported for every distance statistic when a provider returned nothing.
pub const EMPTY_DISTANCE_SENTINEL: f64 = 999.0;

const EXCELLENT_MAX: f64 = 0.3;
const GOOD_MAX: f64 = 0.7;

/// Coarse quality band for a cosine distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Excellent,
    Good,
    Fair,
}

impl ScoreTier {
    /// `d ≤ 0.3` Excellent, `0.3 < d ≤ 0.7` Good, otherwise Fair.
    pub fn classify(distance: f64) -> Self {
        if distance <= EXCELLENT_MAX {
            ScoreTier::Excellent
        } else if distance <= GOOD_MAX {
            ScoreTier::Good
        } else {
            ScoreTier::Fair
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoreTier::Excellent => "excellent",
            ScoreTier::Good => "good",
            ScoreTier::Fair => "fair",
        })
    }
}

pub fn classify(distance: f64) -> ScoreTier {
    ScoreTier::classify(distance)
}

/// Count and average/best/worst distance of one provider's results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub count: usize,
    pub avg_distance: f64,
    pub best_distance: f64,
    pub worst_distance: f64,
}

impl DistanceSummary {
    pub fn empty() -> Self {
        Self {
            count: 0,
            avg_distance: EMPTY_DISTANCE_SENTINEL,
            best_distance: EMPTY_DISTANCE_SENTINEL,
            worst_distance: EMPTY_DISTANCE_SENTINEL,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

pub fn summarize_distances(distances: &[f64]) -> DistanceSummary {
    if distances.is_empty() {
        return DistanceSummary::empty();
    }
    let sum: f64 = distances.iter().sum();
    let best = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let worst = distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    DistanceSummary {
        count: distances.len(),
        avg_distance: sum / distances.len() as f64,
        best_distance: best,
        worst_distance: worst,
    }
}

pub fn summarize(results: &[SearchResult]) -> DistanceSummary {
    let distances: Vec<f64> = results.iter().map(|r| r.distance).collect();
    summarize_distances(&distances)
}

/// One row of the comparison summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub namespace: String,
    #[serde(flatten)]
    pub summary: DistanceSummary,
    pub error: Option<String>,
}

/// Summary per provider, in provider-name order.
pub fn summary_table(result: &ComparisonResult) -> Vec<ProviderSummary> {
    result
        .iter()
        .map(|(name, outcome)| ProviderSummary {
            provider: name.clone(),
            namespace: outcome.target.namespace.clone(),
            summary: summarize(&outcome.results),
            error: outcome.error.as_ref().map(ToString::to_string),
        })
        .collect()
}

/// Provider with the lowest average distance. Providers without results never win.
pub fn best_performer(result: &ComparisonResult) -> Option<ProviderSummary> {
    summary_table(result)
        .into_iter()
        .filter(|row| !row.summary.is_empty())
        .min_by(|a, b| a.summary.avg_distance.total_cmp(&b.summary.avg_distance))
}
