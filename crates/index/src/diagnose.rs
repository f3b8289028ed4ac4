//! Dimension-mismatch diagnosis for remote search failures.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static QUERY_DIMS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Query has dimensions=(\d+)").ok());
static INDEX_DIMS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"index has dimensions=(\d+)").ok());

/// A query vector whose length does not match the index it was sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionMismatch {
    pub query_dimension: usize,
    pub index_dimension: usize,
    /// Best guess at the model that produced the query vector.
    pub query_model: String,
    /// Best guess at the model the index was populated with.
    pub index_model: String,
}

impl DimensionMismatch {
    pub fn new(query_dimension: usize, index_dimension: usize) -> Self {
        Self {
            query_dimension,
            index_dimension,
            query_model: model_for_dimension(query_dimension),
            index_model: model_for_dimension(index_dimension),
        }
    }
}

impl fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dimension mismatch: query has {} dimensions ({}) but index has {} dimensions ({})",
            self.query_dimension, self.query_model, self.index_dimension, self.index_model
        )
    }
}

/// Which embedding model typically produces vectors of this length.
pub fn model_for_dimension(dimension: usize) -> String {
    match dimension {
        768 => "Vertex AI (text-multilingual-embedding-002)".to_string(),
        1024 => "Voyage (voyage-4) or Cohere".to_string(),
        1536 => "OpenAI (text-embedding-3-small)".to_string(),
        3072 => "OpenAI (text-embedding-3-large)".to_string(),
        other => format!("unknown ({other}d)"),
    }
}

fn capture_dimension(re: &Lazy<Option<Regex>>, message: &str) -> Option<usize> {
    re.as_ref()?
        .captures(message)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Recognize the index service's dimension error. Both halves must be present.
pub fn diagnose_dimension_mismatch(message: &str) -> Option<DimensionMismatch> {
    let query = capture_dimension(&QUERY_DIMS, message)?;
    let index = capture_dimension(&INDEX_DIMS, message)?;
    Some(DimensionMismatch::new(query, index))
}
