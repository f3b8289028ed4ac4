//! JSON export of a comparison run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use index::SearchResult;
use matcher::{ComparisonResult, JobOutcome};
use serde::{Deserialize, Serialize};

/// Serializable snapshot of a [`ComparisonResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub providers: BTreeMap<String, ProviderExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderExport {
    pub namespace: String,
    pub region: String,
    pub results: Vec<SearchResult>,
    /// Embed plus search time in seconds.
    pub elapsed_time: f64,
    #[serde(default)]
    pub query_vector_dimension: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobOutcome> for ProviderExport {
    fn from(outcome: &JobOutcome) -> Self {
        Self {
            namespace: outcome.target.namespace.clone(),
            region: outcome.target.region.clone(),
            results: outcome.results.clone(),
            elapsed_time: outcome.elapsed.as_secs_f64(),
            query_vector_dimension: outcome.query_vector_dimension,
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}

impl ExportArtifact {
    pub fn from_result(result: &ComparisonResult) -> Self {
        Self {
            query: result.query.clone(),
            timestamp: result.timestamp,
            providers: result
                .iter()
                .map(|(name, outcome)| (name.clone(), ProviderExport::from(outcome)))
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// `model_comparison_<YYYYmmdd_HHMMSS>.json` for the run's timestamp.
    pub fn suggested_file_name(&self) -> String {
        suggested_file_name(self.timestamp)
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}

pub fn suggested_file_name(timestamp: DateTime<Utc>) -> String {
    format!("model_comparison_{}.json", timestamp.format("%Y%m%d_%H%M%S"))
}
