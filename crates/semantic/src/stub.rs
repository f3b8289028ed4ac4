use async_trait::async_trait;
use fxhash::hash64;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{ProviderIdentity, ProviderKind};
use crate::factory::EmbeddingClientFactory;
use crate::providers::{ensure_query_text, EmbeddingClient};
use crate::EmbedError;

/// Deterministic sinusoid vector derived from a hash of the input text.
/// Same text and dimension always yield the same unit-length vector.
pub fn make_stub_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut v = vec![0f32; dimension];
    let h = hash64(text.as_bytes());
    for (idx, value) in v.iter_mut().enumerate() {
        *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
    }
    l2_normalize_in_place(&mut v);
    v
}

fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Offline client that never touches the network.
#[derive(Debug, Clone)]
pub struct StubEmbeddingClient {
    identity: ProviderIdentity,
}

impl StubEmbeddingClient {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            identity: ProviderIdentity::with_api_key(kind, "stub"),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.identity.vector_dimension = dimension;
        self
    }
}

#[async_trait]
impl EmbeddingClient for StubEmbeddingClient {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        ensure_query_text(text)?;
        Ok(make_stub_vector(text, self.identity.vector_dimension))
    }
}

/// Factory handing out [`StubEmbeddingClient`]s; selected kinds can be made to
/// fail initialization.
#[derive(Debug, Clone, Default)]
pub struct StubClientFactory {
    unconfigured: HashSet<ProviderKind>,
}

impl StubClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `initialize(kind)` fail with a configuration error.
    pub fn without(mut self, kind: ProviderKind) -> Self {
        self.unconfigured.insert(kind);
        self
    }
}

#[async_trait]
impl EmbeddingClientFactory for StubClientFactory {
    async fn initialize(&self, kind: ProviderKind) -> Result<Arc<dyn EmbeddingClient>, EmbedError> {
        if self.unconfigured.contains(&kind) {
            return Err(EmbedError::Configuration(format!(
                "{kind} is not configured"
            )));
        }
        Ok(Arc::new(StubEmbeddingClient::new(kind)))
    }
}
