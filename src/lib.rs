//! Workspace umbrella crate for the embedding comparison engine.
//!
//! One query is embedded by several providers (Vertex AI, Voyage, OpenAI) and
//! each vector searches that provider's own index namespace. This crate ties
//! the provider clients (`semantic`), the vector index client (`index`) and the
//! concurrent orchestrator (`matcher`) together behind YAML configuration,
//! layered credentials and a JSON export.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use embedding_compare::{
//!     load_credentials, CompareConfig, ComparisonOrchestrator, ProviderRegistry, SearchKind,
//!     TurbopufferClient,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CompareConfig::from_file("compare.yaml")?;
//! let credentials = Arc::new(load_credentials(None, &config.env_overrides)?);
//!
//! let index = TurbopufferClient::new(config.index_config(credentials.as_ref())?)?;
//! let orchestrator =
//!     ComparisonOrchestrator::new(Arc::new(ProviderRegistry::new(credentials)), Arc::new(index));
//!
//! let result = orchestrator
//!     .run(config.to_run_request("registered nurse", SearchKind::Titles))
//!     .await?;
//! println!("{} providers compared", result.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod export;

pub use crate::config::{
    load_credentials, parse_secrets, read_secrets_file, CompareConfig, ConfigLoadError,
    IndexYamlConfig, NamespaceMap, ProviderEntry, SearchKind, DEFAULT_REGION, DEFAULT_TOP_K,
    TURBOPUFFER_API_KEY,
};
pub use crate::export::{suggested_file_name, ExportArtifact, ProviderExport};

pub use index::{
    IndexStats, SearchError, SearchResult, TurbopufferClient, TurbopufferConfig,
    VectorIndexClient,
};
pub use matcher::{
    best_performer, classify, summarize, summary_table, CompareError, CompareMetrics,
    ComparisonOrchestrator, ComparisonResult, DistanceSummary, JobError, JobOutcome, JobState,
    ProviderSummary, RunRequest, ScoreTier, SearchTarget,
};
pub use semantic::{
    CredentialSource, EmbedError, EmbeddingClient, EmbeddingClientFactory, EnvCredentials,
    LayeredCredentials, ProviderKind, ProviderRegistry, RetryPolicy, StaticCredentials,
    StubClientFactory, StubEmbeddingClient,
};
