//! Configuration for the retrieval pipeline.
//!
//! Loaded once at startup from TOML. Every section has defaults, so an empty
//! file is a valid configuration. API keys missing from the file are read
//! from the environment (`OPENAI_API_KEY`, `QDRANT_API_KEY`), as is the
//! Qdrant URL (`QDRANT_URL`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use manager_embeddings::{EmbeddingChannel, EmbeddingGateway, OpenAIProvider};
use manager_ingestion::ChunkerConfig;
use manager_llm::OpenAIChatProvider;
use manager_vector_store::{CollectionNames, Distance, QdrantStore};

use crate::error::{Result, RetrievalError};
use crate::prompt::PromptMode;

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding channels, one per embedding model.
    #[serde(rename = "embedding")]
    pub embedding_channels: Vec<EmbeddingChannelConfig>,

    /// Vector store connection and collection names.
    pub vector_store: VectorStoreConfig,

    /// Completion provider connection.
    pub llm: LlmConfig,

    /// Network timeouts.
    pub timeouts: TimeoutConfig,

    /// Retrieval settings.
    pub retrieval: RetrieverConfig,

    /// Intent classifier settings.
    pub classifier: ClassifierConfig,

    /// Re-ranker settings.
    pub rerank: RerankConfig,

    /// Prompt assembly settings.
    pub prompt: PromptConfig,

    /// Final answer generation settings.
    pub generation: GenerationConfig,

    /// Document chunking settings.
    pub chunking: ChunkerConfig,
}

impl RagConfig {
    /// Load a configuration file, fill missing secrets from the process
    /// environment, and validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::parse(&raw)?.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document. The environment is not consulted.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config = Self::parse(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with secrets from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| RetrievalError::Config(e.to_string()))
    }

    /// Fill absent secrets and endpoints from `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let openai_key = lookup("OPENAI_API_KEY");
        for channel in &mut self.embedding_channels {
            if channel.api_key.is_none() {
                channel.api_key.clone_from(&openai_key);
            }
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = openai_key;
        }
        if self.vector_store.api_key.is_none() {
            self.vector_store.api_key = lookup("QDRANT_API_KEY");
        }
        if let Some(url) = lookup("QDRANT_URL") {
            if self.vector_store.url == VectorStoreConfig::default().url {
                self.vector_store.url = url;
            }
        }
        self
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(RetrievalError::Config(
                "retrieval.top_k must be greater than 0".to_string(),
            ));
        }
        for (name, secs) in [
            ("embedding_secs", self.timeouts.embedding_secs),
            ("search_secs", self.timeouts.search_secs),
            ("completion_secs", self.timeouts.completion_secs),
        ] {
            if secs == 0 {
                return Err(RetrievalError::Config(format!(
                    "timeouts.{name} must be greater than 0"
                )));
            }
        }
        if self.embedding_channels.is_empty() {
            return Err(RetrievalError::Config(
                "at least one [[embedding]] channel is required".to_string(),
            ));
        }
        let mut suffixes: Vec<&str> = self
            .embedding_channels
            .iter()
            .map(|c| c.collection_suffix.as_str())
            .collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        if suffixes.len() != self.embedding_channels.len() {
            return Err(RetrievalError::Config(
                "embedding channels must have distinct collection suffixes".to_string(),
            ));
        }
        self.chunking
            .validate()
            .map_err(|e| RetrievalError::Config(e.to_string()))?;
        if self.prompt.reserved_output_tokens >= self.prompt.token_budget {
            return Err(RetrievalError::Config(format!(
                "prompt.reserved_output_tokens ({}) must be smaller than prompt.token_budget ({})",
                self.prompt.reserved_output_tokens, self.prompt.token_budget
            )));
        }
        Ok(())
    }

    /// Collection base names.
    pub fn collection_names(&self) -> CollectionNames {
        CollectionNames {
            global: self.vector_store.global_collection.clone(),
            personal: self.vector_store.personal_collection.clone(),
        }
    }

    /// One OpenAI-compatible provider per `[[embedding]]` table.
    pub fn embedding_gateway(&self) -> EmbeddingGateway {
        self.embedding_channels
            .iter()
            .fold(EmbeddingGateway::new(), |gateway, channel| {
                let mut provider = OpenAIProvider::new()
                    .with_base_url(channel.base_url.as_str())
                    .with_model(channel.model.as_str())
                    .with_timeout(self.timeouts.embedding());
                if let Some(key) = &channel.api_key {
                    provider = provider.with_api_key(key.as_str());
                }
                gateway.with_channel(EmbeddingChannel::new(
                    channel.name.as_str(),
                    channel.collection_suffix.as_str(),
                    Arc::new(provider),
                ))
            })
    }

    pub fn vector_store(&self) -> QdrantStore {
        let store = QdrantStore::new(self.vector_store.url.as_str())
            .with_distance(self.vector_store.distance)
            .with_timeout(self.timeouts.search());
        match &self.vector_store.api_key {
            Some(key) => store.with_api_key(key.as_str()),
            None => store,
        }
    }

    pub fn completion_provider(&self) -> OpenAIChatProvider {
        let chat = OpenAIChatProvider::new()
            .with_base_url(self.llm.base_url.as_str())
            .with_model(self.llm.model.as_str())
            .with_timeout(self.timeouts.completion());
        match &self.llm.api_key {
            Some(key) => chat.with_api_key(key.as_str()),
            None => chat,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_channels: vec![EmbeddingChannelConfig::default()],
            vector_store: VectorStoreConfig::default(),
            llm: LlmConfig::default(),
            timeouts: TimeoutConfig::default(),
            retrieval: RetrieverConfig::default(),
            classifier: ClassifierConfig::default(),
            rerank: RerankConfig::default(),
            prompt: PromptConfig::default(),
            generation: GenerationConfig::default(),
            chunking: ChunkerConfig::default(),
        }
    }
}

/// One embedding model and where its vectors live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingChannelConfig {
    /// Channel name used in logs.
    pub name: String,

    /// Embedding model.
    pub model: String,

    /// Suffix appended to collection names (`""`, `"_bge"`, ...).
    pub collection_suffix: String,

    /// OpenAI-compatible API base URL.
    pub base_url: String,

    /// API key. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
}

impl Default for EmbeddingChannelConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            collection_suffix: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

/// Vector store connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Qdrant URL.
    pub url: String,

    /// Qdrant API key. Falls back to `QDRANT_API_KEY`.
    pub api_key: Option<String>,

    /// Base name of the global collection.
    pub global_collection: String,

    /// Base name of the personal collection.
    pub personal_collection: String,

    /// Metric for newly created collections.
    pub distance: Distance,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        let names = CollectionNames::default();
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            global_collection: names.global,
            personal_collection: names.personal,
            distance: Distance::Cosine,
        }
    }
}

/// Completion provider connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL.
    pub base_url: String,

    /// API key. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Chat model used for classification, re-ranking, and answers.
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Upper bounds on every network call, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embedding_secs: u64,
    pub search_secs: u64,
    pub completion_secs: u64,
}

impl TimeoutConfig {
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn completion(&self) -> Duration {
        Duration::from_secs(self.completion_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_secs: 30,
            search_secs: 10,
            completion_secs: 60,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Nearest chunks fetched per collection.
    pub top_k: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Intent classifier settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Ask the model first. When false, only keywords are used.
    pub enabled: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Re-ranker settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Ask the model to reorder evidence. When false, search order is kept.
    pub enabled: bool,
    /// The judge echoes every passage back, so this must cover
    /// `top_k` chunks per collection.
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

/// Prompt assembly settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub mode: PromptMode,

    /// Total tokens for prompt plus answer.
    pub token_budget: usize,

    /// Tokens kept free for the answer.
    pub reserved_output_tokens: usize,

    /// Length cap of the summary of omitted history, in characters.
    pub summary_max_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            mode: PromptMode::Budgeted,
            token_budget: 4000,
            reserved_output_tokens: 1000,
            summary_max_chars: 500,
        }
    }
}

/// Final answer generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}
