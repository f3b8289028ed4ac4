use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::SearchError;

pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 1000;

/// One nearest-neighbor hit, in the rank order the index returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    /// Cosine distance, 0 to 2; lower is more similar.
    pub distance: f64,
}

pub fn validate_top_k(top_k: usize) -> Result<(), SearchError> {
    if (MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        Ok(())
    } else {
        Err(SearchError::InvalidTopK(top_k))
    }
}

/// Checks every search argument before any network traffic.
pub fn validate_search(
    namespace: &str,
    region: &str,
    vector: &[f32],
    top_k: usize,
) -> Result<(), SearchError> {
    validate_top_k(top_k)?;
    if namespace.trim().is_empty() {
        return Err(SearchError::InvalidRequest("namespace is blank".into()));
    }
    if matches!(namespace.trim(), "." | "..") {
        return Err(SearchError::InvalidRequest(format!(
            "namespace `{namespace}` is not a valid name"
        )));
    }
    validate_region(region)?;
    if vector.is_empty() {
        return Err(SearchError::InvalidRequest("query vector is empty".into()));
    }
    Ok(())
}

/// Regions end up in the host name, so only `[a-z0-9-]` is accepted.
pub fn validate_region(region: &str) -> Result<(), SearchError> {
    let region = region.trim();
    if region.is_empty() {
        return Err(SearchError::InvalidRequest("region is blank".into()));
    }
    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(SearchError::InvalidRequest(format!(
            "region `{region}` may only contain a-z, 0-9 and '-'"
        )));
    }
    Ok(())
}

/// ANN query body: rank by vector distance, return the `text` attribute.
pub fn build_query_payload(vector: &[f32], top_k: usize) -> Value {
    json!({
        "rank_by": ["vector", "ANN", vector],
        "top_k": top_k,
        "include_attributes": ["text"],
    })
}
