//! Document ingestion orchestration.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use manager_embeddings::EmbeddingGateway;
use manager_vector_store::{
    ChunkPayload, CollectionNames, KnowledgeBase, VectorPoint, VectorStore, point_id,
};

use crate::chunker::{ChunkerConfig, TextChunk, TokenChunker};
use crate::error::{IngestionError, Result};
use crate::extraction::{FileType, extract_text};

/// A document to ingest.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Stable document id; re-ingesting the same id replaces all of its
    /// earlier points.
    pub document_id: String,

    /// Human-readable title.
    pub title: Option<String>,

    /// Format of `bytes`.
    pub file_type: FileType,

    /// Raw document bytes.
    pub bytes: Vec<u8>,

    /// Target knowledge base.
    pub knowledge_base: KnowledgeBase,

    /// Owner of a personal document.
    pub user_id: Option<i64>,

    /// Extra metadata copied into every chunk payload.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentSource {
    /// Create a global document.
    pub fn global(document_id: impl Into<String>, file_type: FileType, bytes: Vec<u8>) -> Self {
        Self {
            document_id: document_id.into(),
            title: None,
            file_type,
            bytes,
            knowledge_base: KnowledgeBase::Global,
            user_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a personal document owned by `user_id`.
    pub fn personal(
        document_id: impl Into<String>,
        user_id: i64,
        file_type: FileType,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            knowledge_base: KnowledgeBase::Personal,
            user_id: Some(user_id),
            ..Self::global(document_id, file_type, bytes)
        }
    }

    /// Read a document from disk, inferring its type from the extension.
    ///
    /// The file name becomes the title.
    pub async fn from_path(
        path: &Path,
        document_id: impl Into<String>,
        knowledge_base: KnowledgeBase,
        user_id: Option<i64>,
    ) -> Result<Self> {
        let file_type = FileType::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());
        Ok(Self {
            document_id: document_id.into(),
            title,
            file_type,
            bytes,
            knowledge_base,
            user_id,
            metadata: serde_json::Map::new(),
        })
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn payload_for(&self, chunk: &TextChunk) -> ChunkPayload {
        let mut payload = ChunkPayload::new(chunk.text.clone()).with_document(&self.document_id);
        payload.title = self.title.clone();
        payload.file_type = Some(self.file_type.to_string());
        payload.chunk_index = Some(chunk.chunk_index);
        payload.start_token = Some(chunk.start_token);
        payload.end_token = Some(chunk.end_token);
        payload.extra = self.metadata.clone();
        match self.knowledge_base {
            KnowledgeBase::Global => payload.global(),
            KnowledgeBase::Personal => match self.user_id {
                Some(user_id) => payload.with_user(user_id),
                None => payload,
            },
        }
    }
}

/// Outcome of one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Document id.
    pub document_id: String,

    /// Number of chunks cut from the document.
    pub chunks: usize,

    /// Collections written to, one per embedding channel.
    pub collections: Vec<String>,

    /// Points written across all collections.
    pub points_written: usize,
}

/// Extracts, chunks, embeds, and stores documents.
pub struct Ingestor {
    gateway: EmbeddingGateway,
    store: Arc<dyn VectorStore>,
    collections: CollectionNames,
    chunker: TokenChunker,
}

impl Ingestor {
    /// Create an ingestor with default collection names and chunking.
    pub fn new(gateway: EmbeddingGateway, store: Arc<dyn VectorStore>) -> Result<Self> {
        Ok(Self {
            gateway,
            store,
            collections: CollectionNames::default(),
            chunker: TokenChunker::new(ChunkerConfig::default())?,
        })
    }

    /// Set the collection base names.
    pub fn with_collections(mut self, collections: CollectionNames) -> Self {
        self.collections = collections;
        self
    }

    /// Replace the chunker.
    pub fn with_chunker(mut self, chunker: TokenChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Ingest one document into its knowledge base.
    pub async fn ingest(&self, document: &DocumentSource) -> Result<IngestReport> {
        if document.knowledge_base == KnowledgeBase::Personal && document.user_id.is_none() {
            return Err(IngestionError::MissingOwner(document.document_id.clone()));
        }

        let text = extract_text(&document.bytes, document.file_type)?;
        let chunks = self.chunker.chunk(&text);
        let mut report = IngestReport {
            document_id: document.document_id.clone(),
            chunks: chunks.len(),
            ..IngestReport::default()
        };
        if chunks.is_empty() {
            info!("Document {} has no text; nothing to ingest", document.document_id);
            self.delete_document(&document.document_id, document.knowledge_base)
                .await?;
            return Ok(report);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batches = self.gateway.embed_documents(&texts).await?;

        // A previous version may have had more chunks than this one.
        self.delete_document(&document.document_id, document.knowledge_base)
            .await?;

        for batch in batches {
            let collection = self
                .collections
                .resolve(document.knowledge_base, &batch.collection_suffix);
            self.store
                .ensure_collection(&collection, batch.dimension)
                .await?;

            let points: Vec<VectorPoint> = chunks
                .iter()
                .zip(batch.embeddings)
                .map(|(chunk, vector)| VectorPoint {
                    id: point_id(&document.document_id, chunk.chunk_index),
                    vector,
                    payload: document.payload_for(chunk),
                })
                .collect();

            debug!(
                "Writing {} points for {} via channel {}",
                points.len(),
                document.document_id,
                batch.channel
            );
            report.points_written += points.len();
            self.store.upsert(&collection, points).await?;
            report.collections.push(collection);
        }

        info!(
            "Ingested {} ({} chunks) into {}",
            document.document_id,
            report.chunks,
            report.collections.join(", ")
        );
        Ok(report)
    }

    /// Remove a document from every channel collection of `knowledge_base`.
    pub async fn delete_document(
        &self,
        document_id: &str,
        knowledge_base: KnowledgeBase,
    ) -> Result<Vec<String>> {
        let mut touched = Vec::new();
        for channel in self.gateway.channels() {
            let collection = self
                .collections
                .resolve(knowledge_base, &channel.collection_suffix);
            self.store
                .delete_by_document_id(&collection, document_id)
                .await?;
            touched.push(collection);
        }
        info!("Deleted document {document_id} from {knowledge_base} knowledge base");
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use manager_embeddings::{Embedding, EmbeddingChannel, EmbeddingError, EmbeddingProvider};
    use manager_vector_store::InMemoryStore;
    use pretty_assertions::assert_eq;

    /// Embeds each text as `[len, 1.0]`.
    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn name(&self) -> &str {
            "length"
        }

        fn model(&self) -> &str {
            "length-model"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Embedding>, EmbeddingError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn two_channel_gateway() -> EmbeddingGateway {
        EmbeddingGateway::new()
            .with_channel(EmbeddingChannel::new("primary", "", Arc::new(LengthProvider)))
            .with_channel(EmbeddingChannel::new("bge", "_bge", Arc::new(LengthProvider)))
    }

    fn ingestor(store: Arc<InMemoryStore>) -> Ingestor {
        let chunker = TokenChunker::new(ChunkerConfig {
            max_tokens: 4,
            overlap: 1,
        })
        .unwrap();
        Ingestor::new(two_channel_gateway(), store)
            .unwrap()
            .with_chunker(chunker)
    }

    #[tokio::test]
    async fn test_ingest_personal_writes_every_channel() {
        let store = Arc::new(InMemoryStore::new());
        let ingestor = ingestor(store.clone());
        let doc = DocumentSource::personal(
            "contract",
            7,
            FileType::Txt,
            b"one two three four five six seven".to_vec(),
        )
        .with_title("Label contract");

        let report = ingestor.ingest(&doc).await.unwrap();

        assert_eq!(report.chunks, 2);
        assert_eq!(report.collections, vec!["personal_kb", "personal_kb_bge"]);
        assert_eq!(report.points_written, 4);
        assert_eq!(store.len("personal_kb").await, Some(2));
        assert_eq!(store.len("personal_kb_bge").await, Some(2));

        let hits = store.search("personal_kb", &[1.0, 1.0], 10).await.unwrap();
        for hit in hits {
            assert_eq!(hit.payload.user_id, Some(7));
            assert_eq!(hit.payload.document_id.as_deref(), Some("contract"));
            assert_eq!(hit.payload.title.as_deref(), Some("Label contract"));
            assert_eq!(hit.payload.file_type.as_deref(), Some("txt"));
            assert!(!hit.payload.is_global);
        }
    }

    #[tokio::test]
    async fn test_reingest_replaces_points() {
        let store = Arc::new(InMemoryStore::new());
        let ingestor = ingestor(store.clone());
        let doc = DocumentSource::global("guide", FileType::Txt, b"a b c d e f g".to_vec());

        ingestor.ingest(&doc).await.unwrap();
        ingestor.ingest(&doc).await.unwrap();
        assert_eq!(store.len("global_kb").await, Some(2));

        let long = DocumentSource::global(
            "guide",
            FileType::Txt,
            b"a b c d e f g h i j k l m".to_vec(),
        );
        ingestor.ingest(&long).await.unwrap();
        assert_eq!(store.len("global_kb").await, Some(4));

        let short = DocumentSource::global("guide", FileType::Txt, b"new text".to_vec());
        ingestor.ingest(&short).await.unwrap();

        assert_eq!(store.len("global_kb").await, Some(1));
        assert_eq!(store.len("global_kb_bge").await, Some(1));
        let hits = store.search("global_kb", &[1.0, 1.0], 10).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.payload.chunk.as_str()).collect();
        assert_eq!(texts, vec!["new text"]);
    }

    #[tokio::test]
    async fn test_empty_document_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let ingestor = ingestor(store.clone());
        let doc = DocumentSource::global("blank", FileType::Txt, b"   \n".to_vec());

        let report = ingestor.ingest(&doc).await.unwrap();

        assert_eq!(report.chunks, 0);
        assert!(report.collections.is_empty());
        assert!(store.collections().await.is_empty());
    }

    #[tokio::test]
    async fn test_personal_document_needs_owner() {
        let store = Arc::new(InMemoryStore::new());
        let mut doc = DocumentSource::personal("x", 1, FileType::Txt, b"text".to_vec());
        doc.user_id = None;

        let err = ingestor(store).ingest(&doc).await.unwrap_err();
        assert!(matches!(err, IngestionError::MissingOwner(_)));
    }

    #[tokio::test]
    async fn test_delete_document_clears_every_channel() {
        let store = Arc::new(InMemoryStore::new());
        let ingestor = ingestor(store.clone());
        let keep = DocumentSource::global("keep", FileType::Txt, b"k1 k2".to_vec());
        let drop = DocumentSource::global("drop", FileType::Txt, b"d1 d2 d3 d4 d5".to_vec());
        ingestor.ingest(&keep).await.unwrap();
        ingestor.ingest(&drop).await.unwrap();

        let touched = ingestor
            .delete_document("drop", KnowledgeBase::Global)
            .await
            .unwrap();

        assert_eq!(touched, vec!["global_kb", "global_kb_bge"]);
        assert_eq!(store.len("global_kb").await, Some(1));
        assert_eq!(store.len("global_kb_bge").await, Some(1));
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setlist.txt");
        std::fs::write(&path, "opener closer").unwrap();

        let doc = DocumentSource::from_path(&path, "setlist", KnowledgeBase::Personal, Some(3))
            .await
            .unwrap();

        assert_eq!(doc.file_type, FileType::Txt);
        assert_eq!(doc.title.as_deref(), Some("setlist.txt"));
        assert_eq!(doc.bytes, b"opener closer".to_vec());
    }
}
