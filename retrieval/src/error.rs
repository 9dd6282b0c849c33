//! Error types for the retrieval pipeline.
//!
//! Every variant below except `Config` is recovered inside the pipeline:
//! the caller of [`crate::Agent::generate_response`] only ever sees text.

use thiserror::Error;

use crate::literal::LiteralError;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval pipeline.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The model path of the intent classifier failed or gave no label.
    #[error("intent classification failed: {0}")]
    Classification(String),

    /// Query embedding failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] manager_embeddings::EmbeddingError),

    /// A knowledge-base search failed.
    #[error("search error: {0}")]
    Search(#[from] manager_vector_store::SearchError),

    /// The re-ranking judge answered with something other than a list of
    /// passages.
    #[error("unusable rerank output: {0}")]
    RerankParse(#[from] LiteralError),

    /// A completion call failed.
    #[error("completion error: {0}")]
    Completion(#[from] manager_llm::CompletionError),

    /// Configuration is invalid or unreadable.
    #[error("configuration error: {0}")]
    Config(String),
}
