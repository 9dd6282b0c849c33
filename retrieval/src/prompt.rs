//! Prompt assembly.
//!
//! Output order is fixed: persona system message, optional summary of
//! omitted history, included history oldest first, current query last.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use manager_llm::{ChatMessage, Role, Tokenizer, WhitespaceTokenizer};
use manager_vector_store::KnowledgeBase;

use crate::config::PromptConfig;
use crate::context::RankedContext;

/// Persona every answer is framed with.
pub const PERSONA_HEADER: &str = "You are not a generic AI. You are the user's dedicated personal \
manager for their music artist career. Never act as a generic AI. Always tailor your advice to the \
user's goals, context, and artist career. If you lack information, ask clarifying questions as a \
manager would. If you must rely on general knowledge, relate it to the music industry and the \
user's career.\n";

pub const GLOBAL_HEADING: &str = "Global Knowledge (industry best practices):\n";
pub const PERSONAL_HEADING: &str = "Personal Knowledge (your data):\n";
pub const CHUNK_SEPARATOR: &str = "\n---\n";
pub const NO_CONTEXT_LINE: &str =
    "No specific context available. Relate your answer to the user's music career and goals.";
pub const SUMMARY_PREFIX: &str = "Summary of earlier conversation: ";

const BLOCK_SEPARATOR: &str = "\n\n";

/// How history is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// System prompt with the query line, then the query. History is not sent.
    Simple,
    /// Token-budgeted history with a summary of what did not fit.
    #[default]
    Budgeted,
}

/// Render the persona system prompt.
///
/// The query line is appended when `query` is given.
pub fn system_prompt(context: &RankedContext, query: Option<&str>) -> String {
    let mut blocks = vec![PERSONA_HEADER.to_string()];
    let global = context.texts(KnowledgeBase::Global);
    if !global.is_empty() {
        blocks.push(format!("{GLOBAL_HEADING}{}", global.join(CHUNK_SEPARATOR)));
    }
    let personal = context.texts(KnowledgeBase::Personal);
    if !personal.is_empty() {
        blocks.push(format!("{PERSONAL_HEADING}{}", personal.join(CHUNK_SEPARATOR)));
    }
    if context.is_empty() {
        blocks.push(NO_CONTEXT_LINE.to_string());
    }
    if let Some(query) = query {
        blocks.push(format!("\nUser Query: {query}"));
    }
    blocks.join(BLOCK_SEPARATOR)
}

/// Builds the message sequence sent for the final answer.
#[derive(Clone)]
pub struct PromptBuilder {
    config: PromptConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl PromptBuilder {
    /// Create a builder with the default word tokenizer.
    pub fn new(config: PromptConfig) -> Self {
        Self {
            config,
            tokenizer: Arc::new(WhitespaceTokenizer),
        }
    }

    /// Count tokens with `tokenizer`.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// Build the prompt for `query` in the configured mode.
    pub fn build(
        &self,
        context: &RankedContext,
        query: &str,
        history: &[String],
    ) -> Vec<ChatMessage> {
        match self.config.mode {
            PromptMode::Simple => self.build_simple(context, query),
            PromptMode::Budgeted => self.build_budgeted(context, query, history),
        }
    }

    /// System prompt carrying the query line, then the query.
    pub fn build_simple(&self, context: &RankedContext, query: &str) -> Vec<ChatMessage> {
        let system = system_prompt(context, Some(query));
        debug!("Full prompt: {system}");
        vec![ChatMessage::system(system), ChatMessage::user(query)]
    }

    /// System prompt, then as much recent history as the budget allows,
    /// then the query.
    ///
    /// History is walked newest first and selection stops at the first turn
    /// that would overflow `token_budget` once the system prompt, the query,
    /// and `reserved_output_tokens` are counted. Older turns are replaced by
    /// one summary turn. Roles come from each turn's position in the full
    /// history: even is the user, odd is the assistant.
    pub fn build_budgeted(
        &self,
        context: &RankedContext,
        query: &str,
        history: &[String],
    ) -> Vec<ChatMessage> {
        let system = system_prompt(context, None);
        let fixed = self.tokenizer.count(&system)
            + self.tokenizer.count(query)
            + self.config.reserved_output_tokens;

        let mut used = fixed;
        let mut first_included = history.len();
        for (index, turn) in history.iter().enumerate().rev() {
            let cost = self.tokenizer.count(turn);
            if used + cost > self.config.token_budget {
                break;
            }
            used += cost;
            first_included = index;
        }
        debug!(
            "Prompt tokens: fixed={fixed}, with history={used}, budget={}, turns kept={}/{}",
            self.config.token_budget,
            history.len() - first_included,
            history.len()
        );

        let mut messages = Vec::with_capacity(history.len() - first_included + 3);
        messages.push(ChatMessage::system(system));
        if first_included > 0 {
            messages.push(ChatMessage::system(self.summarize(&history[..first_included])));
        }
        messages.extend(
            history
                .iter()
                .enumerate()
                .skip(first_included)
                .map(|(index, turn)| ChatMessage::new(Role::for_turn(index), turn.clone())),
        );
        messages.push(ChatMessage::user(query));
        messages
    }

    /// Concatenate omitted turns, capped at `summary_max_chars` characters.
    fn summarize(&self, omitted: &[String]) -> String {
        let joined = omitted.join(" ");
        let cap = self.config.summary_max_chars;
        let body = match joined.char_indices().nth(cap) {
            Some((cut, _)) => format!("{}...", &joined[..cut]),
            None => joined,
        };
        format!("{SUMMARY_PREFIX}{body}")
    }
}

impl std::fmt::Debug for PromptBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBuilder")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn budgeted(token_budget: usize, reserved_output_tokens: usize) -> PromptBuilder {
        PromptBuilder::new(PromptConfig {
            mode: PromptMode::Budgeted,
            token_budget,
            reserved_output_tokens,
            summary_max_chars: 20,
        })
    }

    fn turns(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_system_prompt_blocks() {
        let context = RankedContext::from_texts(["g1", "g2"], ["p1"], Some(1));
        let prompt = system_prompt(&context, Some("Q"));

        assert!(prompt.starts_with(PERSONA_HEADER));
        assert!(prompt.contains("Global Knowledge (industry best practices):\ng1\n---\ng2"));
        assert!(prompt.contains("\n\nPersonal Knowledge (your data):\np1"));
        assert!(prompt.ends_with("\n\n\nUser Query: Q"));
        assert!(!prompt.contains(NO_CONTEXT_LINE));
    }

    #[test]
    fn test_empty_context_has_fallback_line() {
        let prompt = system_prompt(&RankedContext::empty(), None);
        assert_eq!(prompt, format!("{PERSONA_HEADER}\n\n{NO_CONTEXT_LINE}"));
    }

    #[test]
    fn test_simple_mode_shape() {
        let builder = PromptBuilder::new(PromptConfig {
            mode: PromptMode::Simple,
            ..PromptConfig::default()
        });
        let history = turns(&["ignored"]);

        let messages = builder.build(&RankedContext::empty(), "Q", &history);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatMessage::user("Q"));
    }

    #[test]
    fn test_all_history_fits() {
        let builder = budgeted(4000, 1000);
        let history = turns(&["hi", "hello there", "tour plans?"]);

        let messages = builder.build(&RankedContext::empty(), "and now?", &history);

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::User]
        );
        assert_eq!(messages[3].content, "tour plans?");
        assert_eq!(messages[4].content, "and now?");
    }

    #[test]
    fn test_overflow_is_summarized() {
        let system_tokens = WhitespaceTokenizer.count(&system_prompt(&RankedContext::empty(), None));
        // Room for exactly the two newest turns (2 tokens each) after the
        // system prompt, a 1-token query, and 5 reserved tokens.
        let builder = budgeted(system_tokens + 1 + 5 + 4, 5);
        let history = turns(&["one one", "two two", "three three", "four four"]);

        let messages = builder.build(&RankedContext::empty(), "q", &history);

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[1],
            ChatMessage::system("Summary of earlier conversation: one one two two")
        );
        assert_eq!(messages[2], ChatMessage::user("three three"));
        assert_eq!(messages[3], ChatMessage::assistant("four four"));
        assert_eq!(messages[4], ChatMessage::user("q"));
    }

    #[test]
    fn test_selection_stops_at_first_overflow() {
        let system_tokens = WhitespaceTokenizer.count(&system_prompt(&RankedContext::empty(), None));
        let builder = budgeted(system_tokens + 1 + 5 + 3, 5);
        // The newest turn fits, the one before does not, the oldest would.
        let history = turns(&["a", "b c d e", "f g"]);

        let messages = builder.build(&RankedContext::empty(), "q", &history);

        let contents: Vec<&str> = messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Summary of earlier conversation: a b c d e", "f g", "q"]
        );
        assert_eq!(messages[2].role, Role::User);
    }

    #[test]
    fn test_summary_is_capped() {
        let builder = budgeted(10, 5);
        let history = turns(&["x".repeat(50).as_str(), "é".repeat(50).as_str()]);

        let messages = builder.build(&RankedContext::empty(), "q", &history);

        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1].content,
            format!("{SUMMARY_PREFIX}{}...", "x".repeat(20))
        );
    }

    #[test]
    fn test_no_history_no_summary() {
        let messages = budgeted(4000, 1000).build(&RankedContext::empty(), "q", &[]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], ChatMessage::user("q"));
    }
}
