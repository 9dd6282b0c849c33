//! Query intent classification.
//!
//! The model is asked first; when it fails or answers without a usable
//! label, fixed keyword lists decide. Ambiguous queries default to
//! [`Intent::Hybrid`] so both knowledge bases are consulted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use manager_llm::{ChatMessage, CompletionProvider, CompletionRequest};

use crate::config::ClassifierConfig;
use crate::error::{Result, RetrievalError};

/// Terms that point at the user's own data or plans.
pub const PERSONAL_KEYWORDS: &[&str] = &[
    "my",
    "me",
    "mine",
    "personal",
    "myself",
    "upload",
    "show",
    "schedule",
    "should i",
    "next week",
];

/// Terms that point at general industry knowledge.
pub const GLOBAL_KEYWORDS: &[&str] = &[
    "industry",
    "trend",
    "market",
    "best practice",
    "professional",
    "general",
];

/// Which knowledge a query needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// The user's own documents.
    Personal,
    /// Shared industry knowledge.
    Global,
    /// Both.
    Hybrid,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Personal => "personal",
            Intent::Global => "global",
            Intent::Hybrid => "hybrid",
        }
    }

    /// Whether the personal knowledge base should be searched.
    pub fn wants_personal(self) -> bool {
        matches!(self, Intent::Personal | Intent::Hybrid)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an intent was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationPath {
    Model,
    Keywords,
}

/// An intent plus the path that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub path: ClassificationPath,
}

/// Read a label out of a model response.
///
/// Checks `personal`, then `global`, then `hybrid`; the first one found
/// anywhere in the lowercased response wins.
pub fn parse_label(response: &str) -> Result<Intent> {
    let lowered = response.to_lowercase();
    [Intent::Personal, Intent::Global, Intent::Hybrid]
        .into_iter()
        .find(|intent| lowered.contains(intent.as_str()))
        .ok_or_else(|| {
            RetrievalError::Classification(format!("no intent label in response: {response:?}"))
        })
}

/// Decide an intent from keyword lists alone.
pub fn classify_by_keywords(query: &str) -> Intent {
    let lowered = query.to_lowercase();
    let has_personal = PERSONAL_KEYWORDS.iter().any(|kw| lowered.contains(kw));
    let has_global = GLOBAL_KEYWORDS.iter().any(|kw| lowered.contains(kw));

    match (has_personal, has_global) {
        (true, true) => Intent::Hybrid,
        (true, false) => Intent::Personal,
        (false, true) => Intent::Global,
        (false, false) => Intent::Hybrid,
    }
}

fn classification_prompt(query: &str) -> String {
    format!(
        "You are an expert assistant. Classify the user query as 'personal' \
         (about the user's own documents, plans, or data), 'global' (general \
         music industry knowledge), or 'hybrid' (needs both). Reply with \
         exactly one word: personal, global, or hybrid.\n\nUser Query: {query}"
    )
}

/// Classifies queries, model first with keyword fallback.
#[derive(Clone)]
pub struct IntentClassifier {
    provider: Option<Arc<dyn CompletionProvider>>,
    config: ClassifierConfig,
}

impl IntentClassifier {
    /// Create a classifier that asks `provider` first.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider: Some(provider),
            config: ClassifierConfig::default(),
        }
    }

    /// Create a classifier that only uses keywords.
    pub fn keywords_only() -> Self {
        Self {
            provider: None,
            config: ClassifierConfig {
                enabled: false,
                ..ClassifierConfig::default()
            },
        }
    }

    /// Set model parameters.
    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Ask the model for a label.
    pub async fn classify_with_model(&self, query: &str) -> Result<Intent> {
        let provider = match &self.provider {
            Some(provider) if self.config.enabled => provider,
            _ => {
                return Err(RetrievalError::Classification(
                    "model classification disabled".to_string(),
                ));
            }
        };

        let request = CompletionRequest::new(
            vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user(classification_prompt(query)),
            ],
            self.config.max_tokens,
            self.config.temperature,
        );
        let response = provider
            .complete(request)
            .await
            .map_err(|e| RetrievalError::Classification(e.to_string()))?;
        parse_label(&response)
    }

    /// Classify a query. Never fails.
    pub async fn classify(&self, query: &str) -> Classification {
        match self.classify_with_model(query).await {
            Ok(intent) => {
                info!("Intent classified as {intent} by model");
                Classification {
                    intent,
                    path: ClassificationPath::Model,
                }
            }
            Err(e) => {
                if self.config.enabled && self.provider.is_some() {
                    warn!("Falling back to keyword intent classification: {e}");
                }
                let intent = classify_by_keywords(query);
                info!("Intent classified as {intent} by keywords");
                Classification {
                    intent,
                    path: ClassificationPath::Keywords,
                }
            }
        }
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use manager_llm::CompletionError;
    use pretty_assertions::assert_eq;

    struct Canned(std::result::Result<&'static str, ()>);

    #[async_trait]
    impl CompletionProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<String, CompletionError> {
            self.0
                .map(str::to_string)
                .map_err(|()| CompletionError::ApiRequest("down".to_string()))
        }
    }

    #[test]
    fn test_keyword_decision_table() {
        assert_eq!(classify_by_keywords("Show my release schedule"), Intent::Personal);
        assert_eq!(
            classify_by_keywords("How does my plan compare to industry norms?"),
            Intent::Hybrid
        );
        assert_eq!(classify_by_keywords("Latest streaming TRENDS"), Intent::Global);
        assert_eq!(classify_by_keywords("How do royalties work?"), Intent::Hybrid);
    }

    #[test]
    fn test_planning_questions_are_personal() {
        assert_eq!(
            classify_by_keywords("What should I do next week?"),
            Intent::Personal
        );
        assert_eq!(
            classify_by_keywords("What are the latest industry trends?"),
            Intent::Global
        );
        assert_eq!(
            classify_by_keywords("Given my uploads and industry, what's best?"),
            Intent::Hybrid
        );
        assert_eq!(classify_by_keywords("How do I succeed?"), Intent::Hybrid);
    }

    #[test]
    fn test_parse_label_priority() {
        assert_eq!(parse_label("Global").unwrap(), Intent::Global);
        assert_eq!(parse_label(" 'hybrid' ").unwrap(), Intent::Hybrid);
        assert_eq!(
            parse_label("hybrid: mixes personal and global").unwrap(),
            Intent::Personal
        );
        assert!(matches!(
            parse_label("no idea"),
            Err(RetrievalError::Classification(_))
        ));
    }

    #[tokio::test]
    async fn test_model_label_used() {
        let classifier = IntentClassifier::new(Arc::new(Canned(Ok("global"))));
        let result = classifier.classify("my schedule").await;

        assert_eq!(
            result,
            Classification {
                intent: Intent::Global,
                path: ClassificationPath::Model
            }
        );
    }

    #[tokio::test]
    async fn test_unrecognized_label_falls_back() {
        let classifier = IntentClassifier::new(Arc::new(Canned(Ok("it depends"))));
        let result = classifier.classify("upload my demo").await;

        assert_eq!(result.intent, Intent::Personal);
        assert_eq!(result.path, ClassificationPath::Keywords);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let classifier = IntentClassifier::new(Arc::new(Canned(Err(()))));
        let result = classifier.classify("market outlook").await;

        assert_eq!(result.intent, Intent::Global);
        assert_eq!(result.path, ClassificationPath::Keywords);
    }

    #[tokio::test]
    async fn test_keywords_only_never_calls_model() {
        let result = IntentClassifier::keywords_only()
            .classify("What are the latest industry trends?")
            .await;
        assert_eq!(result.intent, Intent::Global);
        assert_eq!(result.path, ClassificationPath::Keywords);
    }
}
