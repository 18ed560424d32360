//! Token emission for one line.
//!
//! Every byte of the line ends up in exactly one token. Rule matches are
//! emitted as-is; unmatched characters may be merged into the previous
//! unmatched token of the same type.

use super::token::Token;
use crate::grammar::{PatternMatch, TokenAssign};
use std::ops::Range;
use std::sync::Arc;

pub(crate) struct TokenSink<'l> {
    line: &'l str,
    tokens: Vec<Token>,
    merge_unmatched: bool,
    /// Whether the last token came from unmatched input.
    last_unmatched: bool,
}

impl<'l> TokenSink<'l> {
    pub fn new(line: &'l str, merge_unmatched: bool) -> Self {
        Self {
            line,
            tokens: Vec::new(),
            merge_unmatched,
            last_unmatched: false,
        }
    }

    fn text(&self, span: &Range<usize>) -> &'l str {
        self.line.get(span.clone()).unwrap_or_default()
    }

    pub fn emit(&mut self, kind: &Arc<str>, span: Range<usize>) {
        let value = self.text(&span);
        self.tokens.push(Token::new(Arc::clone(kind), value, span));
        self.last_unmatched = false;
    }

    pub fn emit_unmatched(&mut self, kind: &Arc<str>, span: Range<usize>) {
        let value = self.text(&span);
        if self.merge_unmatched && self.last_unmatched {
            if let Some(last) = self.tokens.last_mut() {
                if last.kind == *kind && last.span.end == span.start {
                    last.value.push_str(value);
                    last.span.end = span.end;
                    return;
                }
            }
        }
        self.tokens.push(Token::new(Arc::clone(kind), value, span));
        self.last_unmatched = true;
    }

    /// Emit the tokens for a rule match.
    ///
    /// Group rules always produce one token per group. A group that did not
    /// participate yields an empty token at the current offset. Match text
    /// outside every group becomes a `gap` token. Overlapping groups are
    /// clipped so nothing is emitted twice.
    pub fn emit_match(&mut self, assign: &TokenAssign, m: &PatternMatch, gap: &Arc<str>) {
        let kinds = match assign {
            TokenAssign::Single(kind) => {
                self.emit(kind, m.start..m.end);
                return;
            }
            TokenAssign::Groups(kinds) => kinds,
        };

        let mut cursor = m.start;
        for (kind, group) in kinds.iter().zip(&m.groups) {
            match group {
                Some(span) => {
                    let start = span.start.clamp(cursor, m.end);
                    let end = span.end.clamp(start, m.end);
                    if start > cursor {
                        self.emit(gap, cursor..start);
                    }
                    self.emit(kind, start..end);
                    cursor = end;
                }
                None => self.emit(kind, cursor..cursor),
            }
        }
        if cursor < m.end {
            self.emit(gap, cursor..m.end);
        }
    }

    pub fn finish(self) -> Vec<Token> {
        self.tokens
    }
}
