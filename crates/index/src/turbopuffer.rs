//! HTTP client for the turbopuffer vector database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::VectorIndexClient;
use crate::normalize::normalize_rows;
use crate::query::{build_query_payload, validate_region, validate_search, SearchResult};
use crate::stats::IndexStats;
use crate::SearchError;

pub const DEFAULT_BASE_URL: &str = "https://{region}.turbopuffer.com";

/// Connection settings. `base_url` may contain a `{region}` placeholder.
#[derive(Clone, Serialize, Deserialize)]
pub struct TurbopufferConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for TurbopufferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurbopufferConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TurbopufferConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Base URL for `region`, without a trailing slash.
    pub fn base_url_for(&self, region: &str) -> String {
        self.base_url
            .replace("{region}", region.trim())
            .trim_end_matches('/')
            .to_string()
    }

    /// `{base}/{version}/namespaces/{namespace}/{action}` for `region`, with
    /// the namespace percent-encoded as a single path segment.
    pub fn namespace_url(
        &self,
        region: &str,
        version: &str,
        namespace: &str,
        action: &str,
    ) -> Result<reqwest::Url, SearchError> {
        validate_region(region)?;
        let base = self.base_url_for(region);
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| SearchError::Configuration(format!("invalid base URL `{base}`: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SearchError::Configuration(format!("base URL `{base}` cannot take a path")))?
            .pop_if_empty()
            .extend([version, "namespaces", namespace.trim(), action]);
        Ok(url)
    }
}

/// [`VectorIndexClient`] backed by turbopuffer's REST API.
#[derive(Debug, Clone)]
pub struct TurbopufferClient {
    config: TurbopufferConfig,
    http: reqwest::Client,
}

impl TurbopufferClient {
    pub fn new(config: TurbopufferConfig) -> Result<Self, SearchError> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::Configuration(
                "TURBOPUFFER_API_KEY is not set".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SearchError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &TurbopufferConfig {
        &self.config
    }

    async fn fetch_metadata(&self, namespace: &str, region: &str) -> Result<Value, SearchError> {
        let url = self.config.namespace_url(region, "v1", namespace, "metadata")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::from_remote(
            Some(status.as_u16()),
            error_message(&body),
        ));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| SearchError::from_remote(Some(status.as_u16()), e.to_string()))
}

/// Pull `error` out of a JSON error body, else use the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl VectorIndexClient for TurbopufferClient {
    async fn search(
        &self,
        namespace: &str,
        region: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        validate_search(namespace, region, vector, top_k)?;

        let url = self.config.namespace_url(region, "v2", namespace, "query")?;
        let payload = build_query_payload(vector, top_k);

        let result: Result<Vec<SearchResult>, SearchError> = async {
            let response = self
                .http
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(&payload)
                .send()
                .await?;
            let body = read_json(response).await?;
            normalize_rows(&body)
        }
        .await;

        match &result {
            Ok(rows) => debug!(namespace, region, rows = rows.len(), "search completed"),
            Err(err) => warn!(
                event = "search_failure",
                namespace,
                region,
                error = %err,
                "index search failed"
            ),
        }
        result
    }

    async fn stats(&self, namespace: &str, region: &str) -> IndexStats {
        match self.fetch_metadata(namespace, region).await {
            Ok(body) => IndexStats::from_metadata(&body, region),
            Err(err) => {
                debug!(namespace, region, error = %err, "index stats unavailable");
                IndexStats::unknown(region)
            }
        }
    }
}
