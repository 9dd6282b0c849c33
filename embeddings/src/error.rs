//! Embedding failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Why a text could not be embedded.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No API key.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// The gateway has no channels to embed with.
    #[error("embedding gateway has no channels")]
    NoChannels,

    /// Non-success response from the provider.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Provider returned a different number of vectors than texts sent.
    #[error("provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Vectors of different lengths were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// HTTP error, including request timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
