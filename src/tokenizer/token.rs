//! Tokens produced by the tokenizer.

use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

/// A typed slice of an input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Token type, e.g. `comment.block.stringtemplate`.
    pub kind: Arc<str>,
    /// The text covered by the token. May be empty for group tokens whose
    /// group matched nothing.
    pub value: String,
    /// Byte span within the line.
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: Arc<str>, value: &str, span: Range<usize>) -> Self {
        Self {
            kind,
            value: value.to_string(),
            span,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Concatenate token values back into the line they came from.
pub fn detokenize(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.value.as_str()).collect()
}
