//! Evidence passed from retrieval to prompt assembly.

use serde::Serialize;

use manager_vector_store::{KnowledgeBase, ScoredPoint};

/// A retrieved passage and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceChunk {
    /// Passage text.
    pub text: String,

    /// Knowledge base the passage was found in.
    pub source: KnowledgeBase,

    /// Owner of a personal passage.
    pub user_id: Option<i64>,

    /// Source document, when recorded.
    pub document_id: Option<String>,

    /// Similarity score reported by the store.
    pub score: f32,
}

impl EvidenceChunk {
    /// Build evidence from a validated search hit.
    pub fn from_point(point: ScoredPoint, source: KnowledgeBase) -> Self {
        Self {
            text: point.payload.chunk,
            source,
            user_id: point.payload.user_id,
            document_id: point.payload.document_id,
            score: point.score,
        }
    }
}

/// Ranked evidence per knowledge base, most relevant first.
///
/// Every chunk in `personal` belongs to the user the context was retrieved
/// for.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedContext {
    pub global: Vec<EvidenceChunk>,
    pub personal: Vec<EvidenceChunk>,
}

impl RankedContext {
    /// A context with no evidence.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether neither bucket holds evidence.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.personal.is_empty()
    }

    /// Total number of chunks.
    pub fn len(&self) -> usize {
        self.global.len() + self.personal.len()
    }

    /// Passage texts of one bucket, in rank order.
    pub fn texts(&self, kb: KnowledgeBase) -> Vec<&str> {
        let bucket = match kb {
            KnowledgeBase::Global => &self.global,
            KnowledgeBase::Personal => &self.personal,
        };
        bucket.iter().map(|c| c.text.as_str()).collect()
    }

    /// Build a context from plain passage texts.
    pub fn from_texts<G, P>(global: G, personal: P, user_id: Option<i64>) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let chunk = |text: String, source: KnowledgeBase, user_id: Option<i64>| EvidenceChunk {
            text,
            source,
            user_id,
            document_id: None,
            score: 0.0,
        };
        Self {
            global: global
                .into_iter()
                .map(|t| chunk(t.into(), KnowledgeBase::Global, None))
                .collect(),
            personal: personal
                .into_iter()
                .map(|t| chunk(t.into(), KnowledgeBase::Personal, user_id))
                .collect(),
        }
    }
}
