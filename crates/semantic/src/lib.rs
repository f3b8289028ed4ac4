//! Embedding provider clients
//!
//! This crate turns a query string into a provider-specific vector. Every
//! provider sits behind the same [`EmbeddingClient`] trait, so the comparison
//! engine never branches on vendor details.
//!
//! Supported providers:
//!
//! - **Vertex AI** `text-multilingual-embedding-002` (768d). Rate-limit and
//!   quota responses are retried up to 3 attempts with linear backoff
//!   (5 s, then 10 s) before surfacing [`EmbedError::RateLimitExceeded`].
//! - **Voyage** `voyage-4` (1024d). Single shot.
//! - **OpenAI** `text-embedding-3-small` (1536d) and `text-embedding-3-large`
//!   (3072d). Single shot.
//!
//! Credentials come from a [`CredentialSource`]. [`LayeredCredentials`]
//! stacks several sources, first non-blank value wins.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{EmbeddingClientFactory, EnvCredentials, ProviderKind, ProviderRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ProviderRegistry::new(Arc::new(EnvCredentials));
//!     let client = registry.initialize(ProviderKind::OpenAiSmall).await.unwrap();
//!     let vector = client.embed("senior rust engineer").await.unwrap();
//!     assert_eq!(vector.len(), 1536);
//! }
//! ```
//!
//! ## Env vars to know
//!
//! - `VERTEX_PROJECT_ID`, `VERTEX_REGION`, `VERTEX_SERVICE_ACCOUNT_FILE`,
//!   `VERTEX_SERVICE_ACCOUNT` (inline JSON), `VERTEX_ACCESS_TOKEN`
//! - `VOYAGE_API_KEY` (or `VOYAGEAI_API_KEY`)
//! - `OPENAI_API_KEY`
//! - `VERTEX_ENDPOINT`, `VOYAGE_ENDPOINT`, `OPENAI_ENDPOINT` to point a
//!   provider at a proxy

pub mod config;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod serde_millis;
pub mod stub;

mod api;

pub use crate::config::{AuthMaterial, ProviderIdentity, ProviderKind, RetryClass, ServiceAccountSource};
pub use crate::credentials::{
    locate_service_account, service_account_candidates, CredentialSource, EnvCredentials,
    LayeredCredentials, StaticCredentials,
};
pub use crate::error::{mentions_rate_limit, EmbedError};
pub use crate::factory::{initialize_client, EmbeddingClientFactory, ProviderRegistry};
pub use crate::providers::{ApiKeyClient, EmbeddingClient, OpenAiClient, VertexClient, VoyageClient};
pub use crate::retry::{execute_with_backoff, RetryOutcome, RetryPolicy};
pub use crate::stub::{make_stub_vector, StubClientFactory, StubEmbeddingClient};

/// Query embedding produced by one provider.
pub type QueryVector = Vec<f32>;
