//! # Ingestion
//!
//! Turns uploaded documents into searchable knowledge-base points.
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────────┐
//! │ bytes    │──▶│ extract   │──▶│ chunk       │──▶│ embed (per   │──▶ upsert
//! │ txt/pdf/ │   │ plain text│   │ 512 tokens, │   │ channel)     │    <kb><suffix>
//! │ docx     │   │           │   │ 64 overlap  │   │              │
//! └──────────┘   └───────────┘   └─────────────┘   └──────────────┘
//! ```
//!
//! Personal documents carry their owner's `user_id` in every payload; global
//! documents are flagged `is_global`. Point ids are derived from
//! `(document_id, chunk_index)`, so re-ingesting a document overwrites it.

pub mod chunker;
pub mod error;
pub mod extraction;
pub mod pipeline;

pub use chunker::{ChunkerConfig, TextChunk, TokenChunker, chunk_text};
pub use error::{IngestionError, Result};
pub use extraction::{FileType, extract_text};
pub use pipeline::{DocumentSource, IngestReport, Ingestor};
