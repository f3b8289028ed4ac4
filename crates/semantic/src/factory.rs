use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ProviderIdentity, ProviderKind};
use crate::credentials::CredentialSource;
use crate::providers::{ApiKeyClient, EmbeddingClient, VertexClient};
use crate::retry::RetryPolicy;
use crate::EmbedError;

/// Builds ready-to-use embedding clients per provider.
#[async_trait]
pub trait EmbeddingClientFactory: Send + Sync {
    async fn initialize(&self, kind: ProviderKind) -> Result<Arc<dyn EmbeddingClient>, EmbedError>;
}

/// Build the client matching `identity.kind`.
pub async fn initialize_client(
    identity: ProviderIdentity,
    vertex_policy: RetryPolicy,
) -> Result<Arc<dyn EmbeddingClient>, EmbedError> {
    match identity.kind {
        ProviderKind::Vertex => Ok(Arc::new(
            VertexClient::initialize(identity)
                .await?
                .with_retry_policy(vertex_policy),
        )),
        ProviderKind::Voyage | ProviderKind::OpenAiSmall | ProviderKind::OpenAiLarge => {
            Ok(Arc::new(ApiKeyClient::new(identity)?))
        }
    }
}

/// Default factory: resolves identities from a credential source.
#[derive(Clone)]
pub struct ProviderRegistry {
    credentials: Arc<dyn CredentialSource>,
    vertex_policy: RetryPolicy,
}

impl ProviderRegistry {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            credentials,
            vertex_policy: RetryPolicy::default(),
        }
    }

    pub fn with_vertex_policy(mut self, policy: RetryPolicy) -> Self {
        self.vertex_policy = policy;
        self
    }

    pub fn identity(&self, kind: ProviderKind) -> Result<ProviderIdentity, EmbedError> {
        ProviderIdentity::resolve(kind, self.credentials.as_ref())
    }
}

#[async_trait]
impl EmbeddingClientFactory for ProviderRegistry {
    async fn initialize(&self, kind: ProviderKind) -> Result<Arc<dyn EmbeddingClient>, EmbedError> {
        let identity = self.identity(kind)?;
        initialize_client(identity, self.vertex_policy).await
    }
}
