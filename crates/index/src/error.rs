use thiserror::Error;

use crate::diagnose::{diagnose_dimension_mismatch, DimensionMismatch};

/// Errors returned by [`VectorIndexClient::search`](crate::VectorIndexClient::search).
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("top_k must be between 1 and 1000, got {0}")]
    InvalidTopK(usize),
    /// Blank namespace/region or empty vector; rejected before any I/O.
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
    /// The client cannot be built (missing API key, bad base URL).
    #[error("index configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    DimensionMismatch(DimensionMismatch),
    /// Any other failure reported by, or on the way to, the index service.
    #[error("remote search failed{}: {message}", status_suffix(.status))]
    Remote {
        status: Option<u16>,
        message: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl SearchError {
    /// Classify a failure message from the index service.
    pub fn from_remote(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        match diagnose_dimension_mismatch(&message) {
            Some(mismatch) => SearchError::DimensionMismatch(mismatch),
            None => SearchError::Remote { status, message },
        }
    }

    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, SearchError::DimensionMismatch(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::from_remote(err.status().map(|s| s.as_u16()), err.to_string())
    }
}
