//! The vector store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::payload::{ScoredPoint, VectorPoint};

/// Distance metric a collection is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean distance.
    Euclid,
}

/// Operations the knowledge pipeline needs from a similarity index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Create `collection` with `dimension`-sized vectors unless it exists.
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Write points, replacing any with the same id. Creates the collection
    /// first if it is missing.
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()>;

    /// Return up to `top_k` nearest points, closest first.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>>;

    /// Remove every point whose payload `document_id` equals `document_id`.
    async fn delete_by_document_id(&self, collection: &str, document_id: &str) -> Result<()>;
}
