//! Error types for the vector store gateway.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur talking to a vector store.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The store rejected the request.
    #[error("vector store returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The store answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Vector dimension does not match the collection.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Similarity computation failed.
    #[error("similarity error: {0}")]
    Similarity(#[from] manager_embeddings::EmbeddingError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error, including request timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
