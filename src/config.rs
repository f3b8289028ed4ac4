//! YAML configuration and credential layering for comparison runs.
//!
//! A configuration names which providers take part, which index namespace each
//! one searches per search kind, and the run defaults (`top_k`, per-job
//! timeout). Credentials are kept out of the file: they are resolved through a
//! [`LayeredCredentials`] stack built by [`load_credentials`].
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "job-titles"
//! top_k: 10
//! job_timeout_secs: 60
//! region: "aws-eu-west-1"
//!
//! providers:
//!   - provider: vertex
//!     namespaces:
//!       titles: "titles-vertex"
//!       skills: "skills-vertex"
//!   - provider: voyage
//!     namespaces:
//!       titles: "titles-voyage"
//!   - provider: openai-small
//!     region: "gcp-us-central1"
//!     namespaces:
//!       titles: "titles-openai"
//!
//! index:
//!   base_url: "https://{region}.turbopuffer.com"
//!   timeout_secs: 30
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use index::{TurbopufferConfig, MAX_TOP_K, MIN_TOP_K};
use matcher::{RunRequest, SearchTarget};
use semantic::{CredentialSource, EnvCredentials, LayeredCredentials, ProviderKind, StaticCredentials};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REGION: &str = "aws-eu-west-1";
pub const DEFAULT_TOP_K: usize = 10;
pub const TURBOPUFFER_API_KEY: &str = "TURBOPUFFER_API_KEY";

const REGION_KEYS: &[&str] = &["TURBOPUFFER_REGION", "DEFAULT_REGION"];

/// Built-in credential defaults, consulted after every other layer.
const CREDENTIAL_DEFAULTS: &[(&str, &str)] = &[
    ("VERTEX_REGION", "us-central1"),
    ("VERTEX_MODEL_NAME", "text-multilingual-embedding-002"),
];

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Which family of namespaces a run searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Titles,
    Skills,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchKind::Titles => "titles",
            SearchKind::Skills => "skills",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchKind {
    type Err = ConfigLoadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "titles" | "title" => Ok(SearchKind::Titles),
            "skills" | "skill" => Ok(SearchKind::Skills),
            other => Err(ConfigLoadError::Validation(format!(
                "unknown search kind `{other}` (expected titles or skills)"
            ))),
        }
    }
}

/// Namespace per search kind. Blank means "not indexed for this kind".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMap {
    #[serde(default)]
    pub titles: String,
    #[serde(default)]
    pub skills: String,
}

impl NamespaceMap {
    pub fn get(&self, kind: SearchKind) -> &str {
        match kind {
            SearchKind::Titles => &self.titles,
            SearchKind::Skills => &self.skills,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub provider: ProviderKind,

    /// Overrides the top-level region for this provider's namespaces.
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub namespaces: NamespaceMap,
}

/// Vector index connection settings. The API key comes from credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    /// Base URL template; `{region}` is substituted per request.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "index.timeout_secs must be > 0".to_string(),
            ));
        }
        if let Some(url) = &self.base_url {
            if url.trim().is_empty() {
                return Err(ConfigLoadError::Validation(
                    "index.base_url must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_index_timeout_secs(),
        }
    }
}

/// Top-level YAML configuration for a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompareConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Per-job deadline; unset means jobs run until their clients give up.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    #[serde(default)]
    pub index: IndexYamlConfig,

    /// Extra credential values, consulted before the process environment.
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

impl CompareConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: CompareConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Derive a configuration from the well-known namespace keys.
    ///
    /// Every provider is listed; the ones without a namespace for the chosen
    /// kind are dropped later by [`to_run_request`](Self::to_run_request).
    pub fn from_credentials(credentials: &dyn CredentialSource) -> Self {
        let region = credentials
            .first_of(REGION_KEYS)
            .unwrap_or_else(default_region);
        let providers = ProviderKind::ALL
            .iter()
            .map(|&provider| {
                let (titles, skills) = namespace_keys(provider);
                ProviderEntry {
                    provider,
                    region: None,
                    namespaces: NamespaceMap {
                        titles: credentials.first_of(titles).unwrap_or_default(),
                        skills: credentials.first_of(skills).unwrap_or_default(),
                    },
                }
            })
            .collect();

        Self {
            region,
            providers,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if !(MIN_TOP_K..=MAX_TOP_K).contains(&self.top_k) {
            return Err(ConfigLoadError::Validation(format!(
                "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}, got {}",
                self.top_k
            )));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(ConfigLoadError::Validation(
                "job_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigLoadError::MissingField("region".to_string()));
        }
        index::validate_region(&self.region)
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;

        let mut seen = HashSet::new();
        for entry in &self.providers {
            if !seen.insert(entry.provider) {
                return Err(ConfigLoadError::Validation(format!(
                    "provider `{}` is listed more than once",
                    entry.provider
                )));
            }
            if matches!(&entry.region, Some(region) if region.trim().is_empty()) {
                return Err(ConfigLoadError::Validation(format!(
                    "provider `{}` has a blank region",
                    entry.provider
                )));
            }
            if let Some(region) = &entry.region {
                index::validate_region(region).map_err(|e| {
                    ConfigLoadError::Validation(format!("provider `{}`: {e}", entry.provider))
                })?;
            }
        }

        self.index.validate()?;
        Ok(())
    }

    /// Targets for `kind`, in configuration order. Providers without a
    /// namespace for `kind` are skipped.
    pub fn targets(&self, kind: SearchKind) -> Vec<SearchTarget> {
        self.providers
            .iter()
            .filter_map(|entry| {
                let namespace = entry.namespaces.get(kind).trim();
                if namespace.is_empty() {
                    return None;
                }
                let region = entry.region.as_deref().unwrap_or(&self.region);
                Some(SearchTarget::new(entry.provider, namespace, region.trim()))
            })
            .collect()
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Build the run request for `query` over every provider indexed for `kind`.
    pub fn to_run_request(&self, query: impl Into<String>, kind: SearchKind) -> RunRequest {
        let mut request = RunRequest::new(query, self.top_k);
        for target in self.targets(kind) {
            request = request.with_target(target);
        }
        match self.job_timeout() {
            Some(limit) => request.with_job_timeout(limit),
            None => request,
        }
    }

    /// Index client settings, with the API key taken from `credentials`.
    pub fn index_config(
        &self,
        credentials: &dyn CredentialSource,
    ) -> Result<TurbopufferConfig, ConfigLoadError> {
        let api_key = credentials
            .get_non_blank(TURBOPUFFER_API_KEY)
            .ok_or_else(|| ConfigLoadError::MissingField(TURBOPUFFER_API_KEY.to_string()))?;
        let config = TurbopufferConfig::new(api_key).with_timeout_secs(self.index.timeout_secs);
        Ok(match &self.index.base_url {
            Some(url) => config.with_base_url(url.trim()),
            None => config,
        })
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            top_k: DEFAULT_TOP_K,
            job_timeout_secs: None,
            region: default_region(),
            providers: Vec::new(),
            index: IndexYamlConfig::default(),
            env_overrides: HashMap::new(),
        }
    }
}

/// Credential keys holding each provider's titles and skills namespaces.
fn namespace_keys(provider: ProviderKind) -> (&'static [&'static str], &'static [&'static str]) {
    match provider {
        ProviderKind::Vertex => (
            &["GEMINI_TITLES_NAMESPACE", "VERTEX_TITLES_NAMESPACE"],
            &["GEMINI_SKILLS_NAMESPACE", "VERTEX_SKILLS_NAMESPACE"],
        ),
        ProviderKind::Voyage => (
            &["VOYAGE_TITLES_NAMESPACE", "VOYAGE_NAMESPACE"],
            &["VOYAGE_SKILLS_NAMESPACE"],
        ),
        ProviderKind::OpenAiSmall => (
            &["OPENAI_TITLES_NAMESPACE", "OPENAI_NAMESPACE"],
            &["OPENAI_SKILLS_NAMESPACE"],
        ),
        ProviderKind::OpenAiLarge => (
            &["OPENAI_LARGE_TITLES_NAMESPACE"],
            &["OPENAI_LARGE_SKILLS_NAMESPACE"],
        ),
    }
}

/// Build the credential stack: secrets file, then `overrides`, then the
/// process environment, then built-in defaults.
///
/// Loading `.env` into the environment is left to the binary.
pub fn load_credentials(
    secrets_file: Option<&Path>,
    overrides: &HashMap<String, String>,
) -> Result<LayeredCredentials, ConfigLoadError> {
    let mut layers = LayeredCredentials::new();
    if let Some(path) = secrets_file {
        layers = layers.push_layer(Arc::new(read_secrets_file(path)?));
    }
    if !overrides.is_empty() {
        layers = layers.push_layer(Arc::new(StaticCredentials::from(overrides.clone())));
    }

    let defaults = CREDENTIAL_DEFAULTS
        .iter()
        .fold(StaticCredentials::new(), |acc, (key, value)| acc.with(*key, *value));
    Ok(layers
        .push_layer(Arc::new(EnvCredentials))
        .push_layer(Arc::new(defaults)))
}

/// Parse a flat YAML map of secrets. Scalar values are kept as strings;
/// nested values are ignored.
pub fn read_secrets_file(path: &Path) -> Result<StaticCredentials, ConfigLoadError> {
    let content = fs::read_to_string(path)?;
    parse_secrets(&content)
}

pub fn parse_secrets(yaml: &str) -> Result<StaticCredentials, ConfigLoadError> {
    let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(yaml)?;
    let mut secrets = StaticCredentials::new();
    for (key, value) in raw {
        let value = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        secrets.insert(key, value);
    }
    Ok(secrets)
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_index_timeout_secs() -> u64 {
    30
}
