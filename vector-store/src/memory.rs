//! In-process vector store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use manager_embeddings::similarity::rank_by_similarity;

use crate::error::{Result, SearchError};
use crate::payload::{ScoredPoint, VectorPoint};
use crate::store::VectorStore;

struct Collection {
    dimension: usize,
    points: HashMap<String, VectorPoint>,
}

/// A [`VectorStore`] held in memory, scored by cosine similarity.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `collection`, or `None` if it does not exist.
    pub async fn len(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.len())
    }

    /// Names of all collections.
    pub async fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(collection) {
            if existing.dimension != dimension {
                return Err(SearchError::DimensionMismatch {
                    expected: existing.dimension,
                    actual: dimension,
                });
            }
            return Ok(());
        }
        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                points: HashMap::new(),
            },
        );
        info!("Created collection {collection} ({dimension} dims)");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()> {
        let Some(first) = points.first() else {
            return Ok(());
        };
        self.ensure_collection(collection, first.vector.len()).await?;

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| SearchError::CollectionNotFound(collection.to_string()))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimension) {
            return Err(SearchError::DimensionMismatch {
                expected: target.dimension,
                actual: bad.vector.len(),
            });
        }

        let count = points.len();
        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        debug!("Upserted {count} points into {collection}");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| SearchError::CollectionNotFound(collection.to_string()))?;

        if query_vector.len() != target.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: target.dimension,
                actual: query_vector.len(),
            });
        }

        let hits = rank_by_similarity(
            query_vector,
            target
                .points
                .values()
                .map(|p| (p.id.as_str(), p.vector.as_slice())),
            top_k,
            f32::MIN,
        )?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                target.points.get(&hit.id).map(|p| ScoredPoint {
                    id: hit.id,
                    score: hit.score,
                    payload: p.payload.clone(),
                })
            })
            .collect())
    }

    async fn delete_by_document_id(&self, collection: &str, document_id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            debug!("Nothing to delete: collection {collection} does not exist");
            return Ok(());
        };
        let before = target.points.len();
        target
            .points
            .retain(|_, p| p.payload.document_id.as_deref() != Some(document_id));
        info!(
            "Deleted {} points of document {document_id} from {collection}",
            before - target.points.len()
        );
        Ok(())
    }
}
