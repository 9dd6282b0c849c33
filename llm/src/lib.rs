//! # LLM
//!
//! The language-model side of the knowledge pipeline:
//!
//! - [`ChatMessage`] / [`Role`]: the prompt payload
//! - [`CompletionProvider`]: `complete(messages, max_tokens, temperature)`
//! - [`OpenAIChatProvider`]: `/chat/completions` over HTTP
//! - [`Tokenizer`]: token counting shared by chunking and prompt budgeting

pub mod error;
pub mod message;
pub mod provider;
pub mod tokenizer;

pub use error::{CompletionError, Result};
pub use message::{ChatMessage, CompletionRequest, Role};
pub use provider::{CompletionProvider, OpenAIChatProvider};
pub use tokenizer::{Tokenizer, WhitespaceTokenizer};
