//! Scripted providers shared by the pipeline tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use manager_embeddings::{Embedding, EmbeddingError, EmbeddingGateway, EmbeddingProvider};
use manager_llm::{CompletionError, CompletionProvider, CompletionRequest};
use manager_vector_store::{
    ChunkPayload, InMemoryStore, ScoredPoint, SearchError, VectorPoint, VectorStore, point_id,
};

/// Embeds every text as the same fixed vector, or fails.
pub struct FixedEmbedder {
    pub vector: Embedding,
    pub fail: bool,
}

impl FixedEmbedder {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            vector: vec![1.0, 0.0],
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            vector: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    fn model(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::ApiRequest("embedding service down".to_string()));
        }
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn is_available(&self) -> bool {
        !self.fail
    }
}

pub fn gateway(embedder: Arc<FixedEmbedder>) -> EmbeddingGateway {
    EmbeddingGateway::single(embedder)
}

/// In-memory store that records searched collections and can fail searches
/// on chosen collections.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryStore,
    pub searched: Mutex<Vec<String>>,
    pub failing: Vec<String>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(collections: &[&str]) -> Self {
        Self {
            failing: collections.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    /// Write chunks with explicit ids, all at `vector`.
    pub async fn seed(&self, collection: &str, vector: &[f32], chunks: Vec<ChunkPayload>) {
        let points = chunks
            .into_iter()
            .enumerate()
            .map(|(i, payload)| VectorPoint {
                id: point_id(collection, i),
                vector: vector.to_vec(),
                payload,
            })
            .collect();
        self.inner.upsert(collection, points).await.unwrap();
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<(), SearchError> {
        self.inner.ensure_collection(collection, dimension).await
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<(), SearchError> {
        self.inner.upsert(collection, points).await
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, SearchError> {
        self.searched.lock().unwrap().push(collection.to_string());
        if self.failing.iter().any(|c| c == collection) {
            return Err(SearchError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.inner.search(collection, query_vector, top_k).await
    }

    async fn delete_by_document_id(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), SearchError> {
        self.inner.delete_by_document_id(collection, document_id).await
    }
}

/// What a scripted model says to each kind of request.
#[derive(Clone)]
pub struct Script {
    pub classify: Result<String, ()>,
    pub rerank: Result<String, ()>,
    pub answer: Result<String, ()>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            classify: Err(()),
            rerank: Err(()),
            answer: Ok("Here is my advice.".to_string()),
        }
    }
}

/// Completion provider that answers from a [`Script`] and records requests.
pub struct ScriptedCompletion {
    pub script: Script,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The final-answer request, if one was made.
    pub fn answer_request(&self) -> Option<CompletionRequest> {
        self.requests()
            .into_iter()
            .find(|r| kind_of(r) == Kind::Answer)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Kind {
    Classify,
    Rerank,
    Answer,
}

fn kind_of(request: &CompletionRequest) -> Kind {
    let last = request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    if last.contains("Classify the user query") {
        Kind::Classify
    } else if last.contains("Passages:") {
        Kind::Rerank
    } else {
        Kind::Answer
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let reply = match kind_of(&request) {
            Kind::Classify => self.script.classify.clone(),
            Kind::Rerank => self.script.rerank.clone(),
            Kind::Answer => self.script.answer.clone(),
        };
        self.requests.lock().unwrap().push(request);
        reply.map_err(|()| CompletionError::ApiRequest("scripted failure".to_string()))
    }
}
