//! Knowledge-base collection naming.

use serde::{Deserialize, Serialize};

/// The two knowledge domains evidence can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBase {
    /// Shared industry knowledge, readable by everyone.
    Global,
    /// Per-user documents. Points carry the owner's `user_id`.
    Personal,
}

impl KnowledgeBase {
    /// Short tag used in logs and prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            KnowledgeBase::Global => "global",
            KnowledgeBase::Personal => "personal",
        }
    }
}

impl std::fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base collection names for each knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionNames {
    /// Base name of the global collection.
    pub global: String,

    /// Base name of the personal collection.
    pub personal: String,
}

impl CollectionNames {
    /// Resolve the collection for a knowledge base and channel suffix.
    pub fn resolve(&self, kb: KnowledgeBase, suffix: &str) -> String {
        let base = match kb {
            KnowledgeBase::Global => &self.global,
            KnowledgeBase::Personal => &self.personal,
        };
        format!("{base}{suffix}")
    }
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            global: "global_kb".to_string(),
            personal: "personal_kb".to_string(),
        }
    }
}
