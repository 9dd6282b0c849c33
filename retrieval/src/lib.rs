//! # Retrieval
//!
//! Turns a user message plus conversation history into a grounded answer
//! from the artist-manager persona.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             Agent                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  message ──► IntentClassifier ──► personal | global | hybrid    │
//! │                  (model, then keywords)         │               │
//! │                                                 ▼               │
//! │              ContextRetriever ──► EmbeddingGateway              │
//! │                     │         ──► VectorStore (per channel)     │
//! │                     ▼                                           │
//! │                 Reranker (model judge, identity fallback)       │
//! │                     │                                           │
//! │                     ▼                                           │
//! │              RankedContext { global, personal }                 │
//! │                     │                                           │
//! │                     ▼                                           │
//! │              PromptBuilder (simple | budgeted history)          │
//! │                     │                                           │
//! │                     ▼                                           │
//! │              CompletionProvider ──► answer or fallback text     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage degrades instead of failing: a bad classification falls back
//! to keywords, a failed knowledge base is left out, an unusable ranking
//! keeps search order, and a failed completion becomes a polite apology.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use manager_retrieval::{Agent, RagConfig};
//!
//! let config = RagConfig::from_file("manager.toml")?;
//! let agent = Agent::from_config(&config)?;
//!
//! let answer = agent
//!     .generate_response("How should I plan my next release?", &history, Some(user_id))
//!     .await;
//! ```

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod intent;
pub mod literal;
pub mod prompt;
pub mod reranker;
pub mod retriever;

pub use agent::{Agent, AgentBuilder, AgentTrace, fallback_response};
pub use config::RagConfig;
pub use context::{EvidenceChunk, RankedContext};
pub use error::{Result, RetrievalError};
pub use intent::{Classification, ClassificationPath, Intent, IntentClassifier};
pub use literal::{LiteralError, extract_string_list};
pub use prompt::{PromptBuilder, PromptMode, system_prompt};
pub use reranker::Reranker;
pub use retriever::ContextRetriever;

// Re-export from dependencies for convenience
pub use manager_vector_store::KnowledgeBase;
