//! Typed point payloads.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use manager_embeddings::Embedding;

/// Namespace for point ids derived from document chunks.
const POINT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c5e_8a4b_4f0e_9c3d_7b2a_1e5f_4d80);

/// Derive the point id for chunk `chunk_index` of `document_id`.
///
/// Stable across runs, so upserting the same document twice replaces its
/// points instead of duplicating them.
pub fn point_id(document_id: &str, chunk_index: usize) -> String {
    Uuid::new_v5(
        &POINT_NAMESPACE,
        format!("{document_id}:{chunk_index}").as_bytes(),
    )
    .to_string()
}

/// Payload stored alongside every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// The chunk text.
    pub chunk: String,

    /// Owner of a personal chunk. Absent for global chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Source document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    /// Source document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Source file type (`txt`, `pdf`, `docx`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Position of the chunk within its document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    /// First token offset (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_token: Option<usize>,

    /// Last token offset (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_token: Option<usize>,

    /// Whether the chunk belongs to the global knowledge base.
    #[serde(default)]
    pub is_global: bool,

    /// Any other metadata the document carried.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChunkPayload {
    /// Create a payload holding only chunk text.
    pub fn new(chunk: impl Into<String>) -> Self {
        Self {
            chunk: chunk.into(),
            user_id: None,
            document_id: None,
            title: None,
            file_type: None,
            chunk_index: None,
            start_token: None,
            end_token: None,
            is_global: false,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the owning user.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the source document.
    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Mark as a global chunk.
    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    /// Validate a raw payload from the store.
    ///
    /// Returns `None` (and logs) for payloads without a string `chunk` or
    /// with mistyped known fields; such points are unusable as evidence.
    pub fn from_value(point_id: &str, value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Dropping point {point_id}: invalid payload: {e}");
                None
            }
        }
    }
}

/// A point to write into a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    /// Point id.
    pub id: String,

    /// The embedding.
    pub vector: Embedding,

    /// Chunk payload.
    pub payload: ChunkPayload,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    /// Point id.
    pub id: String,

    /// Similarity score, higher is closer.
    pub score: f32,

    /// Validated payload.
    pub payload: ChunkPayload,
}
