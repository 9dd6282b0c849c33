//! Model-judged evidence re-ranking.
//!
//! The judge is told to answer with nothing but a list literal of the
//! passages in relevance order. Its answer is untrusted: anything that does
//! not parse into a list of strings leaves the input order untouched.

use std::sync::Arc;

use tracing::{debug, info, warn};

use manager_llm::{ChatMessage, CompletionProvider, CompletionRequest};

use crate::config::RerankConfig;
use crate::error::Result;
use crate::literal::extract_string_list;

fn rerank_prompt(query: &str, chunks: &[String]) -> String {
    let passages = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {chunk}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are an expert assistant. Given the user query and a list of context passages, \
         rank the passages by their relevance to the query, most relevant first.\n\n\
         User Query: {query}\n\n\
         Passages:\n{passages}\n\n\
         Respond with ONLY a Python list of strings containing the full text of each passage, \
         most relevant first. Do not number the passages, do not add any explanation, \
         and do not wrap the list in prose."
    )
}

/// Reorders passages by model-judged relevance.
#[derive(Clone)]
pub struct Reranker {
    provider: Option<Arc<dyn CompletionProvider>>,
    config: RerankConfig,
}

impl Reranker {
    /// Create a re-ranker judged by `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider: Some(provider),
            config: RerankConfig::default(),
        }
    }

    /// A re-ranker that keeps the input order.
    pub fn identity() -> Self {
        Self {
            provider: None,
            config: RerankConfig {
                enabled: false,
                ..RerankConfig::default()
            },
        }
    }

    /// Set model parameters.
    pub fn with_config(mut self, config: RerankConfig) -> Self {
        self.config = config;
        self
    }

    /// Ask the judge for an order.
    ///
    /// A valid list of strings is returned as given, even when it drops or
    /// repeats passages; the caller filters by membership.
    pub async fn try_rerank(
        &self,
        provider: &dyn CompletionProvider,
        query: &str,
        chunks: &[String],
    ) -> Result<Vec<String>> {
        let request = CompletionRequest::new(
            vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user(rerank_prompt(query, chunks)),
            ],
            self.config.max_tokens,
            self.config.temperature,
        );
        let response = provider.complete(request).await?;
        debug!("Rerank response: {response}");
        Ok(extract_string_list(&response)?)
    }

    /// Reorder `chunks`, most relevant first. Never fails: any problem with
    /// the judge or its answer returns `chunks` unchanged.
    pub async fn rerank(&self, query: &str, chunks: Vec<String>) -> Vec<String> {
        let provider = match &self.provider {
            Some(provider) if self.config.enabled && !chunks.is_empty() => provider,
            _ => return chunks,
        };

        info!("Re-ranking {} chunks", chunks.len());
        match self.try_rerank(provider.as_ref(), query, &chunks).await {
            Ok(ranked) => {
                debug!("Judge returned {} passages", ranked.len());
                ranked
            }
            Err(e) => {
                warn!("Re-ranking failed, keeping retrieval order: {e}");
                chunks
            }
        }
    }
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}
