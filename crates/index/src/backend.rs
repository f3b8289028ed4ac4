use async_trait::async_trait;
use std::sync::Arc;

use crate::query::SearchResult;
use crate::stats::IndexStats;
use crate::SearchError;

/// Remote vector index seam.
///
/// Implementations validate arguments (see [`validate_search`](crate::validate_search))
/// before any network traffic.
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Nearest neighbors of `vector` in `namespace`, in index rank order.
    async fn search(
        &self,
        namespace: &str,
        region: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    /// Namespace metadata. Falls back to [`IndexStats::unknown`] on any failure.
    async fn stats(&self, namespace: &str, region: &str) -> IndexStats;
}

#[async_trait]
impl<T: VectorIndexClient + ?Sized> VectorIndexClient for Arc<T> {
    async fn search(
        &self,
        namespace: &str,
        region: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        (**self).search(namespace, region, vector, top_k).await
    }

    async fn stats(&self, namespace: &str, region: &str) -> IndexStats {
        (**self).stats(namespace, region).await
    }
}
