//! Parser for list literals embedded in model output.
//!
//! Grammar, applied to untrusted text:
//!
//! ```text
//! response := prose? fence? prose? '[' ... ']' prose?
//! value    := string+ | number | True | False | None | true | false | null
//!           | '[' (value (',' value)* ','?)? ']'
//!           | '(' (value (',' value)* ','?)? ')'
//! string   := '...' | "..."            (backslash escapes, adjacent
//!                                       literals concatenate)
//! ```
//!
//! When the response holds a fenced code block, only its body is searched.
//! The candidate region runs from the first `[` to the last `]`.

use thiserror::Error;

/// Why a response did not yield a list of strings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiteralError {
    /// No bracketed region.
    #[error("no list literal found")]
    NoList,

    /// The bracketed region is not a valid literal.
    #[error("invalid literal at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// The literal is not a list.
    #[error("literal is not a list")]
    NotAList,

    /// An element is not a string.
    #[error("element {index} is not a string")]
    NonString { index: usize },
}

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
}

/// Extract a list of strings from a model response.
pub fn extract_string_list(response: &str) -> Result<Vec<String>, LiteralError> {
    match extract_literal(response)? {
        Literal::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Literal::Str(s) => Ok(s),
                _ => Err(LiteralError::NonString { index }),
            })
            .collect(),
        _ => Err(LiteralError::NotAList),
    }
}

/// Locate and parse the bracketed literal in a model response.
pub fn extract_literal(response: &str) -> Result<Literal, LiteralError> {
    let body = strip_fence(response);
    let start = body.find('[').ok_or(LiteralError::NoList)?;
    let end = body.rfind(']').ok_or(LiteralError::NoList)?;
    if end < start {
        return Err(LiteralError::NoList);
    }
    let region = &body[start..=end];

    let mut parser = Parser::new(region);
    let value = parser.value()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Body of the first fenced code block, or the whole text when there is no
/// fence or the fence holds no list.
fn strip_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_ticks = &text[open + 3..];
    // Skip the info string (`python`, `json`, ...) on the opening line.
    let body_start = after_ticks.find('\n').map_or(0, |i| i + 1);
    let body = &after_ticks[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    if body.contains('[') { body } else { text }
}

/// Deepest list/tuple nesting accepted.
const MAX_DEPTH: usize = 32;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError::Syntax {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => {
                self.bump();
                Ok(Literal::List(self.sequence(']')?))
            }
            Some('(') => {
                self.bump();
                Ok(Literal::Tuple(self.sequence(')')?))
            }
            Some('\'' | '"') => self.strings(),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Vec<Literal>, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let items = self.items(close);
        self.depth -= 1;
        items
    }

    fn items(&mut self, close: char) -> Result<Vec<Literal>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => return Ok(items),
                Some(_) => return Err(self.error("expected ',' or closing bracket")),
                None => return Err(self.error("unterminated sequence")),
            }
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Literal, LiteralError> {
        let mut out = self.string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_whitespace();
            if matches!(self.peek(), Some('\'' | '"')) {
                out.push_str(&self.string()?);
            } else {
                self.pos = checkpoint;
                return Ok(Literal::Str(out));
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self
            .bump()
            .ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // Escaped newline continues the literal.
            Some('\n') => {}
            Some('x') => out.push(self.hex_char(2)?),
            Some('u') => out.push(self.hex_char(4)?),
            Some('U') => out.push(self.hex_char(8)?),
            // Unknown escapes keep the backslash.
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => return Err(self.error("unterminated escape")),
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.bump();
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        text.parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| LiteralError::Syntax {
                offset: start,
                message: format!("invalid number {text:?}"),
            })
    }

    fn keyword(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            "None" | "null" => Ok(Literal::Null),
            word => Err(LiteralError::Syntax {
                offset: start,
                message: format!("unknown name {word:?}"),
            }),
        }
    }
}
