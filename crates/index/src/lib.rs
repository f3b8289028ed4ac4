//! # Vector index client
//!
//! Search client for remotely hosted vector indexes. The crate does no
//! indexing of its own: it sends a query vector to the index service, turns
//! whatever row layout comes back into ranked [`SearchResult`]s and explains
//! dimension-mismatch failures in terms of the embedding models involved.
//!
//! ## Key pieces
//!
//! - [`VectorIndexClient`]: the async seam the comparison engine depends on.
//! - [`TurbopufferClient`]: the HTTP implementation.
//! - [`normalize_row`]: the single row-normalization function, with a fixed
//!   fallback chain per field.
//! - [`diagnose_dimension_mismatch`]: parses `Query has dimensions=Q` /
//!   `index has dimensions=I` out of a failure message.
//!
//! ## Example
//!
//! ```no_run
//! use index::{TurbopufferClient, TurbopufferConfig, VectorIndexClient};
//!
//! # async fn run(vector: Vec<f32>) -> Result<(), index::SearchError> {
//! let client = TurbopufferClient::new(TurbopufferConfig::new("tpuf_api_key"))?;
//! let hits = client.search("titles-openai", "aws-eu-west-1", &vector, 10).await?;
//! for hit in hits {
//!     println!("{:.3} {}", hit.distance, hit.text);
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod diagnose;
mod error;
pub mod normalize;
mod query;
mod stats;
pub mod turbopuffer;

pub use backend::VectorIndexClient;
pub use diagnose::{diagnose_dimension_mismatch, model_for_dimension, DimensionMismatch};
pub use error::SearchError;
pub use normalize::{normalize_row, normalize_rows, MISSING_FIELD};
pub use query::{
    build_query_payload, validate_region, validate_search, validate_top_k, SearchResult, MAX_TOP_K, MIN_TOP_K,
};
pub use stats::IndexStats;
pub use turbopuffer::{TurbopufferClient, TurbopufferConfig, DEFAULT_BASE_URL};
