//! Response orchestration.
//!
//! One pass per message: classify, retrieve, build the prompt, complete.
//! Nothing is retried. Any failure ends in [`fallback_response`], so callers
//! always get text back.

use std::sync::Arc;

use tracing::{debug, error, info};

use manager_llm::{CompletionProvider, CompletionRequest};
use manager_vector_store::VectorStore;

use crate::config::{GenerationConfig, RagConfig};
use crate::context::RankedContext;
use crate::error::Result;
use crate::intent::{Classification, IntentClassifier};
use crate::prompt::PromptBuilder;
use crate::reranker::Reranker;
use crate::retriever::ContextRetriever;

/// The apology returned when any stage fails.
pub fn fallback_response(user_message: &str) -> String {
    format!(
        "I apologize, but I'm having trouble processing your request right now. \
         You said: '{user_message}'. Please try again in a moment, or feel free to ask a \
         different question about your music career or creative process."
    )
}

/// What the pipeline did for one message, for callers that want more than
/// the final text.
#[derive(Debug, Clone)]
pub struct AgentTrace {
    pub classification: Classification,
    pub context: RankedContext,
    pub prompt_messages: usize,
}

/// Sequences classification, retrieval, prompt assembly, and completion.
pub struct Agent {
    classifier: IntentClassifier,
    retriever: ContextRetriever,
    prompt: PromptBuilder,
    completion: Arc<dyn CompletionProvider>,
    generation: GenerationConfig,
    top_k: usize,
}

impl Agent {
    /// Create an agent builder.
    pub fn builder(
        retriever: ContextRetriever,
        completion: Arc<dyn CompletionProvider>,
    ) -> AgentBuilder {
        AgentBuilder::new(retriever, completion)
    }

    /// Wire the OpenAI-compatible providers and Qdrant from configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let gateway = config.embedding_gateway();
        let store: Arc<dyn VectorStore> = Arc::new(config.vector_store());
        let completion: Arc<dyn CompletionProvider> = Arc::new(config.completion_provider());

        let retriever = ContextRetriever::new(gateway, store)
            .with_collections(config.collection_names())
            .with_reranker(Reranker::new(completion.clone()).with_config(config.rerank));

        Ok(Self::builder(retriever, completion.clone())
            .with_classifier(IntentClassifier::new(completion).with_config(config.classifier))
            .with_prompt(PromptBuilder::new(config.prompt))
            .with_generation(config.generation)
            .with_top_k(config.retrieval.top_k)
            .build())
    }

    /// Answer `user_message`. Always returns text.
    pub async fn generate_response(
        &self,
        user_message: &str,
        history: &[String],
        user_id: Option<i64>,
    ) -> String {
        match self.run(user_message, history, user_id).await {
            Ok((response, _)) => response,
            Err(e) => {
                error!("Response generation failed, returning fallback: {e}");
                fallback_response(user_message)
            }
        }
    }

    /// Run the pipeline once and report what it did.
    pub async fn run(
        &self,
        user_message: &str,
        history: &[String],
        user_id: Option<i64>,
    ) -> Result<(String, AgentTrace)> {
        let classification = self.classifier.classify(user_message).await;
        let context = self
            .retriever
            .retrieve(user_message, user_id, classification.intent, self.top_k)
            .await;
        let messages = self.prompt.build(&context, user_message, history);
        let prompt_messages = messages.len();

        if let Some(system) = messages.first() {
            let preview: String = system.content.chars().take(200).collect();
            info!("Built prompt with {prompt_messages} messages: {preview}... (truncated)");
        }

        let request = CompletionRequest::new(
            messages,
            self.generation.max_tokens,
            self.generation.temperature,
        )
        .with_top_p(self.generation.top_p);
        let response = self.completion.complete(request).await?;
        debug!("Generated {} characters", response.len());

        Ok((
            response,
            AgentTrace {
                classification,
                context,
                prompt_messages,
            },
        ))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("classifier", &self.classifier)
            .field("retriever", &self.retriever)
            .field("prompt", &self.prompt)
            .field("completion", &self.completion.name())
            .field("generation", &self.generation)
            .field("top_k", &self.top_k)
            .finish()
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    classifier: IntentClassifier,
    retriever: ContextRetriever,
    prompt: PromptBuilder,
    completion: Arc<dyn CompletionProvider>,
    generation: GenerationConfig,
    top_k: usize,
}

impl AgentBuilder {
    /// Start from keyword-only classification and the default prompt.
    pub fn new(retriever: ContextRetriever, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            classifier: IntentClassifier::keywords_only(),
            retriever,
            prompt: PromptBuilder::new(Default::default()),
            completion,
            generation: GenerationConfig::default(),
            top_k: 3,
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            classifier: self.classifier,
            retriever: self.retriever,
            prompt: self.prompt,
            completion: self.completion,
            generation: self.generation,
            top_k: self.top_k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fallback_echoes_message() {
        assert_eq!(
            fallback_response("When should I drop my EP?"),
            "I apologize, but I'm having trouble processing your request right now. You said: \
             'When should I drop my EP?'. Please try again in a moment, or feel free to ask a \
             different question about your music career or creative process."
        );
    }

    #[test]
    fn test_from_config_wires_everything() {
        let config = RagConfig::default();
        let agent = Agent::from_config(&config).unwrap();
        assert_eq!(agent.top_k, 3);
        assert_eq!(agent.generation, GenerationConfig::default());
    }
}
