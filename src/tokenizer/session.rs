//! Per-document tokenization sessions.

use super::{ContextStack, LineStats, Token, Tokenizer};
use serde::Serialize;

/// Totals over everything a session has tokenized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub lines: usize,
    pub tokens: usize,
    #[serde(flatten)]
    pub totals: LineStats,
}

/// One document being tokenized line by line.
///
/// The session owns its context stack; the compiled rules behind the
/// tokenizer are shared. Dropping a session at any line boundary is fine.
#[derive(Debug, Clone)]
pub struct Session<'g> {
    tokenizer: Tokenizer<'g>,
    initial: ContextStack,
    state: ContextStack,
    stats: SessionStats,
}

impl<'g> Session<'g> {
    pub fn new(tokenizer: Tokenizer<'g>) -> Self {
        let initial = tokenizer.initial_state();
        Self::with_state(tokenizer, initial)
    }

    /// Start the session in the named state instead of `start`.
    pub fn starting_at(tokenizer: Tokenizer<'g>, state: &str) -> Option<Self> {
        let initial = tokenizer.state_for(state)?;
        Some(Self::with_state(tokenizer, initial))
    }

    fn with_state(tokenizer: Tokenizer<'g>, initial: ContextStack) -> Self {
        Self {
            tokenizer,
            state: initial.clone(),
            initial,
            stats: SessionStats::default(),
        }
    }

    /// Tokenize the next line of the document.
    pub fn tokenize_line(&mut self, line: &str) -> Vec<Token> {
        let out = self.tokenizer.tokenize_line(&self.state, line);
        self.stats.lines += 1;
        self.stats.tokens += out.tokens.len();
        self.stats.totals += out.stats;
        if out.stats.stalls > 0 {
            tracing::debug!(
                line = self.stats.lines,
                stalls = out.stats.stalls,
                "characters fell through to the fallback token"
            );
        }
        self.state = out.state;
        out.tokens
    }

    /// Tokenize a whole text, one entry per line. Line terminators (`\n` or
    /// `\r\n`) are not part of any token.
    pub fn tokenize_document(&mut self, text: &str) -> Vec<Vec<Token>> {
        text.lines().map(|line| self.tokenize_line(line)).collect()
    }

    /// Stack that the next line will start from.
    pub fn state(&self) -> &ContextStack {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Go back to the initial stack and clear the counters.
    pub fn reset(&mut self) {
        self.state = self.initial.clone();
        self.stats = SessionStats::default();
    }
}
