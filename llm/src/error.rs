//! Error types for completion providers.

use thiserror::Error;

/// Result type alias for completion operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Errors that can occur requesting a completion.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// Provider not configured.
    #[error("completion provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The response carried no usable text.
    #[error("empty completion")]
    Empty,

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP error, including request timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
