//! # Embeddings
//!
//! The embedding gateway turns text into dense vectors for the
//! knowledge-base retrieval pipeline.
//!
//! ## Features
//!
//! - **Providers**: OpenAI-compatible `/embeddings` endpoints behind one trait
//! - **Channels**: several embedding models side by side, each paired with
//!   the collection suffix its vectors live under
//! - **Similarity**: cosine helpers used by in-process vector stores
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embedding Gateway                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingGateway ──► EmbeddingChannel ──► EmbeddingProvider    │
//! │        │                    │                    │              │
//! │        ▼                    ▼                    ▼              │
//! │  ChannelEmbedding    collection suffix     OpenAI / custom      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod gateway;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use gateway::{ChannelBatch, ChannelEmbedding, EmbeddingChannel, EmbeddingGateway};
pub use provider::{EmbeddingProvider, OpenAIProvider};
pub use similarity::{ScoredId, cosine_similarity, rank_by_similarity};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (varies by model).
pub const DEFAULT_DIMENSION: usize = 1536; // OpenAI text-embedding-3-small
