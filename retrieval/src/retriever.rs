//! Evidence retrieval across knowledge bases.
//!
//! ```text
//! query ──► embed once per channel ──┬─► global_kb<suffix>   (always)
//!                                    └─► personal_kb<suffix> (personal/hybrid intent
//!                                                             with a known user)
//!                   merge channels by point id ◄─┘
//!                   drop personal hits owned by anyone else
//!                   re-rank global + personal together
//!                   split back into buckets by membership
//! ```
//!
//! Each knowledge base fails on its own: a failed search is logged and that
//! bucket stays empty. Only a failed query embedding empties the whole
//! context.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use manager_embeddings::{ChannelEmbedding, EmbeddingGateway};
use manager_vector_store::{CollectionNames, KnowledgeBase, ScoredPoint, VectorStore};

use crate::context::{EvidenceChunk, RankedContext};
use crate::error::Result;
use crate::intent::Intent;
use crate::reranker::Reranker;

/// Fetches, filters, and ranks evidence for a query.
pub struct ContextRetriever {
    gateway: EmbeddingGateway,
    store: Arc<dyn VectorStore>,
    collections: CollectionNames,
    reranker: Reranker,
}

impl ContextRetriever {
    /// Create a retriever with default collection names and no re-ranking.
    pub fn new(gateway: EmbeddingGateway, store: Arc<dyn VectorStore>) -> Self {
        Self {
            gateway,
            store,
            collections: CollectionNames::default(),
            reranker: Reranker::identity(),
        }
    }

    /// Set the collection base names.
    pub fn with_collections(mut self, collections: CollectionNames) -> Self {
        self.collections = collections;
        self
    }

    /// Set the re-ranker.
    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = reranker;
        self
    }

    /// Retrieve ranked evidence. Never fails; degraded sources are empty.
    pub async fn retrieve(
        &self,
        query: &str,
        user_id: Option<i64>,
        intent: Intent,
        top_k: usize,
    ) -> RankedContext {
        info!("Retrieving context (intent={intent}, user_id={user_id:?}, top_k={top_k})");

        let vectors = match self.gateway.embed_query(query).await {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!("Query embedding failed, continuing without context: {e}");
                return RankedContext::empty();
            }
        };

        let global = match self
            .search_knowledge_base(KnowledgeBase::Global, &vectors, top_k)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Global knowledge retrieval failed: {e}");
                Vec::new()
            }
        };
        info!("Retrieved {} global chunks", global.len());

        let personal = match user_id {
            Some(user_id) if intent.wants_personal() => {
                match self
                    .search_knowledge_base(KnowledgeBase::Personal, &vectors, top_k)
                    .await
                {
                    Ok(hits) => {
                        let owned = owned_by(hits, user_id);
                        info!("Retrieved {} personal chunks", owned.len());
                        owned
                    }
                    Err(e) => {
                        warn!("Personal knowledge retrieval failed: {e}");
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!("Skipping personal knowledge base");
                Vec::new()
            }
        };

        if global.is_empty() && personal.is_empty() {
            return RankedContext::empty();
        }
        self.rank(query, global, personal).await
    }

    /// Search one knowledge base on every channel and merge by point id.
    ///
    /// A failure on any channel fails the knowledge base.
    pub async fn search_knowledge_base(
        &self,
        kb: KnowledgeBase,
        vectors: &[ChannelEmbedding],
        top_k: usize,
    ) -> Result<Vec<EvidenceChunk>> {
        let mut per_channel = Vec::with_capacity(vectors.len());
        for vector in vectors {
            let collection = self.collections.resolve(kb, &vector.collection_suffix);
            let hits = self
                .store
                .search(&collection, &vector.embedding, top_k)
                .await?;
            debug!("{collection}: {} hits via {}", hits.len(), vector.channel);
            per_channel.push(hits);
        }
        Ok(merge_by_id(per_channel)
            .into_iter()
            .map(|point| EvidenceChunk::from_point(point, kb))
            .collect())
    }

    async fn rank(
        &self,
        query: &str,
        global: Vec<EvidenceChunk>,
        personal: Vec<EvidenceChunk>,
    ) -> RankedContext {
        let texts: Vec<String> = global
            .iter()
            .chain(personal.iter())
            .map(|c| c.text.clone())
            .collect();
        let ranked = self.reranker.rerank(query, texts).await;

        RankedContext {
            global: partition(&ranked, global),
            personal: partition(&ranked, personal),
        }
    }
}

/// Concatenate per-channel hits, keeping the first occurrence of each id.
pub fn merge_by_id(per_channel: Vec<Vec<ScoredPoint>>) -> Vec<ScoredPoint> {
    let mut seen = HashSet::new();
    per_channel
        .into_iter()
        .flatten()
        .filter(|point| seen.insert(point.id.clone()))
        .collect()
}

/// Keep only chunks owned by `user_id`.
fn owned_by(chunks: Vec<EvidenceChunk>, user_id: i64) -> Vec<EvidenceChunk> {
    let before = chunks.len();
    let owned: Vec<EvidenceChunk> = chunks
        .into_iter()
        .filter(|c| c.user_id == Some(user_id))
        .collect();
    if owned.len() < before {
        warn!(
            "Dropped {} personal chunks not owned by user {user_id}",
            before - owned.len()
        );
    }
    owned
}

/// Order `bucket` by `ranked`, dropping ranked texts outside the bucket and
/// repeated texts.
fn partition(ranked: &[String], mut bucket: Vec<EvidenceChunk>) -> Vec<EvidenceChunk> {
    let mut out = Vec::with_capacity(bucket.len());
    let mut taken = HashSet::new();
    for text in ranked {
        if !taken.insert(text.as_str()) {
            continue;
        }
        if let Some(pos) = bucket.iter().position(|c| &c.text == text) {
            out.push(bucket.swap_remove(pos));
        }
    }
    out
}

impl std::fmt::Debug for ContextRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRetriever")
            .field("gateway", &self.gateway)
            .field("store", &self.store.name())
            .field("collections", &self.collections)
            .field("reranker", &self.reranker)
            .finish()
    }
}
