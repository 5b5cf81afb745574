//! Remote ANN service boundary
//!
//! [`AnnService`] is the outbound contract the remote index adapter needs:
//! upsert, query, delete and index statistics, plus fetch-by-id. The
//! [`PineconeClient`] implements it over Pinecone's REST data plane; tests
//! and alternative services implement it directly.
//!
//! Set `PINECONE_API_KEY` (or `[pinecone] api_key` in config) to select it.

mod client;

pub use client::{normalize_host, PineconeClient, API_VERSION, CONTROL_PLANE_URL};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Metadata;

/// A vector as the service stores it: id, values and a flat payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One ranked match returned by a query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredVector {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Aggregate statistics the service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescription {
    pub dimension: usize,
    pub total_vector_count: usize,
}

/// Outbound operations against a remote approximate-nearest-neighbour index.
///
/// Implementations hold no record state and must be safe to call from many
/// threads at once.
pub trait AnnService: Send + Sync {
    fn upsert(&self, vectors: &[VectorRecord]) -> Result<()>;

    /// Top `top_k` matches with payload; ordering and scores are the service's
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredVector>>;

    /// Delete by id. Ids the service does not know are not an error.
    fn delete(&self, ids: &[String]) -> Result<()>;

    fn describe_index_stats(&self) -> Result<IndexDescription>;

    /// Stored vectors for the ids that exist; unknown ids are omitted
    fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>>;
}
