//! Error types for document ingestion.

use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Errors that can occur ingesting or deleting a document.
#[derive(Error, Debug)]
pub enum IngestionError {
    /// The file type has no extractor.
    #[error("unsupported file type for ingestion: {0}")]
    UnsupportedFileType(String),

    /// Text extraction failed.
    #[error("failed to extract text from {file_type}: {message}")]
    Extraction { file_type: String, message: String },

    /// Chunker parameters are unusable.
    #[error("invalid chunking: overlap {overlap} must be smaller than max_tokens {max_tokens}")]
    InvalidChunking { max_tokens: usize, overlap: usize },

    /// A personal document was submitted without an owner.
    #[error("personal document {0} has no owner")]
    MissingOwner(String),

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] manager_embeddings::EmbeddingError),

    /// Vector store operation failed.
    #[error("vector store error: {0}")]
    Store(#[from] manager_vector_store::SearchError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
