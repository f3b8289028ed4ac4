use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::credentials::CredentialSource;
use crate::EmbedError;

/// Embedding providers the comparison engine knows how to call.
///
/// Dispatch is always on this enum; provider names are derived from it, never
/// parsed back out of free-form strings at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Google Vertex AI `text-multilingual-embedding-002` (768d).
    #[serde(rename = "vertex", alias = "gemini")]
    Vertex,
    /// Voyage AI `voyage-4` (1024d).
    #[serde(rename = "voyage")]
    Voyage,
    /// OpenAI `text-embedding-3-small` (1536d).
    #[serde(rename = "openai-small", alias = "openai")]
    OpenAiSmall,
    /// OpenAI `text-embedding-3-large` (3072d).
    #[serde(rename = "openai-large")]
    OpenAiLarge,
}

/// How a provider reacts to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Back off and retry on rate-limit signals, up to a fixed ceiling.
    BoundedRetry,
    /// One request; every failure propagates.
    SingleShot,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Vertex,
        ProviderKind::Voyage,
        ProviderKind::OpenAiSmall,
        ProviderKind::OpenAiLarge,
    ];

    /// Stable provider name used as the comparison key.
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Vertex => "vertex",
            ProviderKind::Voyage => "voyage",
            ProviderKind::OpenAiSmall => "openai-small",
            ProviderKind::OpenAiLarge => "openai-large",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Vertex => "text-multilingual-embedding-002",
            ProviderKind::Voyage => "voyage-4",
            ProviderKind::OpenAiSmall => "text-embedding-3-small",
            ProviderKind::OpenAiLarge => "text-embedding-3-large",
        }
    }

    /// Vector length the provider's default model produces.
    pub fn default_dimension(self) -> usize {
        match self {
            ProviderKind::Vertex => 768,
            ProviderKind::Voyage => 1024,
            ProviderKind::OpenAiSmall => 1536,
            ProviderKind::OpenAiLarge => 3072,
        }
    }

    pub fn retry_class(self) -> RetryClass {
        match self {
            ProviderKind::Vertex => RetryClass::BoundedRetry,
            ProviderKind::Voyage | ProviderKind::OpenAiSmall | ProviderKind::OpenAiLarge => {
                RetryClass::SingleShot
            }
        }
    }

    /// Human-facing label, e.g. `Vertex AI (text-multilingual-embedding-002)`.
    pub fn label(self) -> String {
        let vendor = match self {
            ProviderKind::Vertex => "Vertex AI",
            ProviderKind::Voyage => "Voyage",
            ProviderKind::OpenAiSmall | ProviderKind::OpenAiLarge => "OpenAI",
        };
        format!("{vendor} ({})", self.default_model())
    }

    /// Credential key overriding the provider's HTTP endpoint.
    fn endpoint_key(self) -> &'static str {
        match self {
            ProviderKind::Vertex => "VERTEX_ENDPOINT",
            ProviderKind::Voyage => "VOYAGE_ENDPOINT",
            ProviderKind::OpenAiSmall | ProviderKind::OpenAiLarge => "OPENAI_ENDPOINT",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertex" | "gemini" => Ok(ProviderKind::Vertex),
            "voyage" => Ok(ProviderKind::Voyage),
            "openai" | "openai-small" => Ok(ProviderKind::OpenAiSmall),
            "openai-large" => Ok(ProviderKind::OpenAiLarge),
            other => Err(EmbedError::Configuration(format!(
                "unknown embedding provider '{other}'"
            ))),
        }
    }
}

/// Where a Vertex service account comes from.
#[derive(Clone, PartialEq)]
pub enum ServiceAccountSource {
    /// Path as configured; resolved against the candidate list at init time.
    File(PathBuf),
    /// Inline JSON payload from a secret store.
    Inline(String),
}

impl fmt::Debug for ServiceAccountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAccountSource::File(path) => f.debug_tuple("File").field(path).finish(),
            ServiceAccountSource::Inline(_) => f.write_str("Inline(<redacted>)"),
        }
    }
}

/// Provider-specific authentication material.
#[derive(Clone, PartialEq)]
pub enum AuthMaterial {
    /// Bearer API key (Voyage, OpenAI).
    ApiKey(String),
    /// Google Cloud project access for Vertex AI.
    Google {
        project_id: String,
        location: String,
        /// Pre-minted OAuth access token, when supplied directly.
        access_token: Option<String>,
        service_account: Option<ServiceAccountSource>,
    },
}

impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMaterial::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            AuthMaterial::Google {
                project_id,
                location,
                access_token,
                service_account,
            } => f
                .debug_struct("Google")
                .field("project_id", project_id)
                .field("location", location)
                .field("access_token", &access_token.as_ref().map(|_| "<redacted>"))
                .field("service_account", service_account)
                .finish(),
        }
    }
}

/// Everything needed to build one provider's embedding client.
///
/// Resolved once per run from a [`CredentialSource`] and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderIdentity {
    pub kind: ProviderKind,
    /// Comparison key (see [`ProviderKind::name`]).
    pub name: String,
    pub model: String,
    /// Expected length of every vector this provider returns.
    pub vector_dimension: usize,
    pub auth: AuthMaterial,
    /// Optional endpoint override (proxies, tests).
    pub endpoint: Option<String>,
}

impl ProviderIdentity {
    /// Resolve a provider's identity from configuration values.
    ///
    /// Fails with [`EmbedError::Configuration`] when a required key is absent.
    pub fn resolve(
        kind: ProviderKind,
        credentials: &dyn CredentialSource,
    ) -> Result<Self, EmbedError> {
        let (model, auth) = match kind {
            ProviderKind::Vertex => {
                let project_id = credentials.get_non_blank("VERTEX_PROJECT_ID").ok_or_else(|| {
                    EmbedError::Configuration("`VERTEX_PROJECT_ID` not found in secrets".into())
                })?;
                let location = credentials
                    .get_non_blank("VERTEX_REGION")
                    .unwrap_or_else(|| "us-central1".into());
                let service_account = credentials
                    .get_non_blank("VERTEX_SERVICE_ACCOUNT")
                    .map(ServiceAccountSource::Inline)
                    .or_else(|| {
                        credentials
                            .get_non_blank("VERTEX_SERVICE_ACCOUNT_FILE")
                            .map(|path| ServiceAccountSource::File(PathBuf::from(path)))
                    });
                let model = credentials
                    .get_non_blank("VERTEX_MODEL_NAME")
                    .unwrap_or_else(|| kind.default_model().into());
                (
                    model,
                    AuthMaterial::Google {
                        project_id,
                        location,
                        access_token: credentials.get_non_blank("VERTEX_ACCESS_TOKEN"),
                        service_account,
                    },
                )
            }
            ProviderKind::Voyage => {
                let key = credentials
                    .first_of(&["VOYAGE_API_KEY", "VOYAGEAI_API_KEY"])
                    .ok_or_else(|| {
                        EmbedError::Configuration("`VOYAGE_API_KEY` not found in secrets".into())
                    })?;
                (kind.default_model().to_string(), AuthMaterial::ApiKey(key))
            }
            ProviderKind::OpenAiSmall | ProviderKind::OpenAiLarge => {
                let key = credentials.get_non_blank("OPENAI_API_KEY").ok_or_else(|| {
                    EmbedError::Configuration("`OPENAI_API_KEY` not found in secrets".into())
                })?;
                (kind.default_model().to_string(), AuthMaterial::ApiKey(key))
            }
        };

        Ok(Self {
            kind,
            name: kind.name().to_string(),
            model,
            vector_dimension: kind.default_dimension(),
            auth,
            endpoint: credentials.get_non_blank(kind.endpoint_key()),
        })
    }

    /// Build an identity with an explicit API key, skipping credential lookup.
    pub fn with_api_key(kind: ProviderKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            model: kind.default_model().to_string(),
            vector_dimension: kind.default_dimension(),
            auth: AuthMaterial::ApiKey(key.into()),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.vector_dimension = dimension;
        self
    }
}
