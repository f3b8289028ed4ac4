//! Concrete embedding clients, one per provider family.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::api::{build_api_payload, endpoint_for, parse_single_embedding, send_api_request};
use crate::config::{AuthMaterial, ProviderIdentity, ProviderKind, ServiceAccountSource};
use crate::credentials::locate_service_account;
use crate::retry::{execute_with_backoff, RetryPolicy};
use crate::EmbedError;

const VERTEX_RATE_LIMIT_MESSAGE: &str = "Vertex AI rate limit exceeded. Please wait a moment and try again, or remove the Vertex namespace to compare the other providers.";

/// Turns query text into a provider-specific vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Identity this client was initialized with.
    fn identity(&self) -> &ProviderIdentity;

    /// Embed non-blank `text` as a retrieval query.
    ///
    /// The returned vector always has `identity().vector_dimension` entries.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

pub(crate) fn ensure_query_text(text: &str) -> Result<(), EmbedError> {
    if text.trim().is_empty() {
        return Err(EmbedError::InvalidInput("query text is blank".into()));
    }
    Ok(())
}

fn log_success(identity: &ProviderIdentity, attempts: u32) {
    info!(
        event = "embed_success",
        provider = %identity.name,
        model = %identity.model,
        dimension = identity.vector_dimension,
        attempts,
        "query embedded"
    );
}

/// Vertex AI client with bounded rate-limit retry.
#[derive(Debug)]
pub struct VertexClient {
    identity: ProviderIdentity,
    endpoint: String,
    access_token: String,
    policy: RetryPolicy,
    // Keeps an inline service account on disk for as long as the client lives.
    _service_account: Option<NamedTempFile>,
}

impl VertexClient {
    /// Resolve the service account, obtain an access token and build the client.
    pub async fn initialize(identity: ProviderIdentity) -> Result<Self, EmbedError> {
        let AuthMaterial::Google {
            access_token,
            service_account,
            ..
        } = &identity.auth
        else {
            return Err(EmbedError::Configuration(
                "Vertex AI requires Google project credentials".into(),
            ));
        };

        let (service_account_path, temp_file) = match service_account {
            Some(ServiceAccountSource::Inline(json)) => {
                let file = write_inline_service_account(json)?;
                (Some(file.path().to_path_buf()), Some(file))
            }
            Some(ServiceAccountSource::File(path)) => (Some(locate_service_account(path)?), None),
            None => (None, None),
        };

        let access_token = match access_token {
            Some(token) => token.clone(),
            None => mint_access_token(service_account_path.as_deref()).await?,
        };

        debug!(
            provider = %identity.name,
            service_account = ?service_account_path,
            "vertex client initialized"
        );

        Ok(Self {
            endpoint: endpoint_for(&identity),
            identity,
            access_token,
            policy: RetryPolicy::default(),
            _service_account: temp_file,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl EmbeddingClient for VertexClient {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        ensure_query_text(text)?;
        let payload = build_api_payload(self.identity.kind, &self.identity.model, text);
        let payload = &payload;
        let endpoint = self.endpoint.as_str();
        let token = self.access_token.as_str();
        let expected = self.identity.vector_dimension;

        let outcome = execute_with_backoff(
            &self.policy,
            &self.identity.name,
            VERTEX_RATE_LIMIT_MESSAGE,
            move |_| async move {
                let body = send_api_request(endpoint, token, payload).await?;
                parse_single_embedding(body, expected)
            },
        )
        .await;

        let attempts = outcome.attempts;
        let vector = outcome.into_result()?;
        log_success(&self.identity, attempts);
        Ok(vector)
    }
}

fn write_inline_service_account(json: &str) -> Result<NamedTempFile, EmbedError> {
    serde_json::from_str::<serde_json::Value>(json).map_err(|e| {
        EmbedError::Configuration(format!("VERTEX_SERVICE_ACCOUNT is not valid JSON: {e}"))
    })?;
    let mut file = tempfile::Builder::new()
        .prefix("vertex-sa-")
        .suffix(".json")
        .tempfile()?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    Ok(file)
}

async fn mint_access_token(service_account: Option<&Path>) -> Result<String, EmbedError> {
    let mut command = Command::new("gcloud");
    command.args(["auth", "application-default", "print-access-token"]);
    if let Some(path) = service_account {
        command.env("GOOGLE_APPLICATION_CREDENTIALS", PathBuf::from(path));
    }
    run_token_command(command).await
}

/// Run `command` and return its trimmed stdout as a token. The child is
/// killed if the future is dropped.
async fn run_token_command(mut command: Command) -> Result<String, EmbedError> {
    command.kill_on_drop(true);
    let output = command.output().await.map_err(|e| {
        EmbedError::Configuration(format!("unable to reach Google auth via gcloud: {e}"))
    })?;
    if !output.status.success() {
        return Err(EmbedError::Configuration(format!(
            "gcloud could not mint an access token: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(EmbedError::Configuration(
            "gcloud returned an empty access token".into(),
        ));
    }
    Ok(token)
}

/// Single-shot client for bearer-key providers (Voyage, OpenAI).
#[derive(Debug)]
pub struct ApiKeyClient {
    identity: ProviderIdentity,
    endpoint: String,
    api_key: String,
}

pub type VoyageClient = ApiKeyClient;
pub type OpenAiClient = ApiKeyClient;

impl ApiKeyClient {
    pub fn new(identity: ProviderIdentity) -> Result<Self, EmbedError> {
        if identity.kind == ProviderKind::Vertex {
            return Err(EmbedError::Configuration(
                "Vertex AI does not authenticate with an API key".into(),
            ));
        }
        let api_key = match &identity.auth {
            AuthMaterial::ApiKey(key) if !key.trim().is_empty() => key.clone(),
            _ => {
                return Err(EmbedError::Configuration(format!(
                    "{} requires an API key",
                    identity.name
                )))
            }
        };
        Ok(Self {
            endpoint: endpoint_for(&identity),
            identity,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingClient for ApiKeyClient {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        ensure_query_text(text)?;
        let payload = build_api_payload(self.identity.kind, &self.identity.model, text);
        let body = send_api_request(&self.endpoint, &self.api_key, &payload).await?;
        let vector = parse_single_embedding(body, self.identity.vector_dimension)?;
        log_success(&self.identity, 1);
        Ok(vector)
    }
}
