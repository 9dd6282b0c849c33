//! # Vector Store Gateway
//!
//! Wraps a similarity index behind the three operations the knowledge
//! pipeline needs (`upsert`, `search`, `delete_by_document_id`) and enforces
//! the conventions every caller relies on:
//!
//! - collections are named `<knowledge base><channel suffix>`
//!   (`global_kb`, `personal_kb_bge`, ...)
//! - every point carries a [`ChunkPayload`]; search hits whose payload does
//!   not validate never leave the gateway
//! - point ids are derived from `(document_id, chunk_index)` so re-ingesting
//!   a document overwrites its previous points
//!
//! Two backends are provided: [`QdrantStore`] for the Qdrant REST API and
//! [`InMemoryStore`] for tests and single-process use.

pub mod collection;
pub mod error;
pub mod memory;
pub mod payload;
pub mod qdrant;
pub mod store;

pub use collection::{CollectionNames, KnowledgeBase};
pub use error::{Result, SearchError};
pub use memory::InMemoryStore;
pub use payload::{ChunkPayload, ScoredPoint, VectorPoint, point_id};
pub use qdrant::QdrantStore;
pub use store::{Distance, VectorStore};
