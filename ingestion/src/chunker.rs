//! Token-window document chunking.
//!
//! Documents are cut into fixed windows of `max_tokens` tokens. Consecutive
//! windows share `overlap` tokens so a sentence straddling a boundary is
//! still whole in one of them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use manager_llm::{Tokenizer, WhitespaceTokenizer};

use crate::error::{IngestionError, Result};

/// A window of text cut from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// The chunk text, decoded from its tokens.
    pub text: String,

    /// Position of the chunk within the document.
    pub chunk_index: usize,

    /// First token offset (inclusive).
    pub start_token: usize,

    /// Last token offset (exclusive).
    pub end_token: usize,
}

impl TextChunk {
    /// Number of tokens in this chunk.
    pub fn token_len(&self) -> usize {
        self.end_token - self.start_token
    }
}

/// Configuration for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk size in tokens.
    pub max_tokens: usize,

    /// Tokens shared by consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap: 64,
        }
    }
}

impl ChunkerConfig {
    /// Check that windows advance.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 || self.overlap >= self.max_tokens {
            return Err(IngestionError::InvalidChunking {
                max_tokens: self.max_tokens,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.max_tokens - self.overlap
    }
}

/// Chunker slicing on a [`Tokenizer`]'s boundaries.
#[derive(Clone)]
pub struct TokenChunker {
    config: ChunkerConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenChunker {
    /// Create a chunker with the default word tokenizer.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        Self::with_tokenizer(config, Arc::new(WhitespaceTokenizer))
    }

    /// Create a chunker with a custom tokenizer.
    pub fn with_tokenizer(config: ChunkerConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tokenizer })
    }

    /// The chunker configuration.
    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Cut `text` into overlapping windows.
    ///
    /// Windows start every `stride` tokens. The last window may be shorter,
    /// and no window starts once the previous one reached the end of the
    /// text, so every chunk contributes at least one new token.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let tokens = self.tokenizer.tokenize(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < tokens.len() {
            let end = (start + self.config.max_tokens).min(tokens.len());
            chunks.push(TextChunk {
                text: self.tokenizer.decode(&tokens[start..end]),
                chunk_index: chunks.len(),
                start_token: start,
                end_token: end,
            });
            if end == tokens.len() {
                break;
            }
            start += self.config.stride();
        }

        debug!(
            "Chunked {} tokens into {} chunks",
            tokens.len(),
            chunks.len()
        );
        chunks
    }
}

impl std::fmt::Debug for TokenChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenChunker")
            .field("config", &self.config)
            .finish()
    }
}

/// Chunk `text` with the default word tokenizer.
pub fn chunk_text(text: &str, max_tokens: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    let chunker = TokenChunker::new(ChunkerConfig {
        max_tokens,
        overlap,
    })?;
    Ok(chunker.chunk(text))
}
