//! Token counting.
//!
//! Chunking slices documents on token boundaries and prompt budgeting sums
//! token counts, so both go through the same [`Tokenizer`].

/// Splits text into tokens and joins them back.
pub trait Tokenizer: Send + Sync {
    /// Split `text` into tokens. Concatenating the tokens with
    /// [`Tokenizer::decode`] must reproduce `text`, except that
    /// whitespace-only input has no tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Join tokens back into text.
    fn decode(&self, tokens: &[String]) -> String {
        tokens.concat()
    }

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize {
        self.tokenize(text).len()
    }
}

/// Word-level tokenizer: each token is one whitespace-delimited word plus
/// the whitespace that follows it.
///
/// Leading whitespace is kept on the first token so decoding is exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_trailing_space = false;

        for ch in text.chars() {
            if ch.is_whitespace() {
                in_trailing_space = true;
                current.push(ch);
                continue;
            }
            let starts_word = in_trailing_space && current.chars().any(|c| !c.is_whitespace());
            if starts_word {
                tokens.push(std::mem::take(&mut current));
            }
            in_trailing_space = false;
            current.push(ch);
        }

        // Whitespace-only input carries no tokens.
        if current.chars().any(|c| !c.is_whitespace()) {
            tokens.push(current);
        }
        tokens
    }

    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokens_keep_trailing_whitespace() {
        let tokens = WhitespaceTokenizer.tokenize("hello  big\nworld");
        assert_eq!(tokens, vec!["hello  ", "big\n", "world"]);
    }

    #[test]
    fn test_decode_is_exact() {
        let text = "  leading space, then\ttabs \n and a tail \n";
        let tokenizer = WhitespaceTokenizer;
        let tokens = tokenizer.tokenize(text);

        assert_eq!(tokens.len(), 7);
        assert_eq!(tokenizer.decode(&tokens), text);
    }

    #[test]
    fn test_count_matches_tokenize() {
        let tokenizer = WhitespaceTokenizer;
        for text in ["", "   ", "one", " a b  c ", "x\ny\tz"] {
            assert_eq!(tokenizer.count(text), tokenizer.tokenize(text).len(), "{text:?}");
        }
    }
}
