//! The match loop.
//!
//! [`Tokenizer::tokenize_line`] takes the context stack left by the previous
//! line and splits a line into tokens:
//!
//! - the rules of the state on top of the stack are tried in order, anchored
//!   at the current offset, and the first match wins,
//! - the match is turned into tokens (one per match, or one per group) and
//!   the rule's transition is applied to the stack,
//! - when nothing matches, one character is consumed as the state's default
//!   token, or as the fallback token when the state has none (a stall).
//!
//! Every step consumes input or changes the stack, and zero-width transitions
//! at a single offset are capped, so the loop always terminates.

mod emit;
mod session;
mod stack;
mod token;

pub use session::{Session, SessionStats};
pub use stack::ContextStack;
pub use token::{detokenize, Token};

use crate::grammar::{CompiledRule, CompiledRuleSet, CompiledState, PatternMatch, Transition};
use crate::settings::TokenizerSettings;
use emit::TokenSink;
use serde::Serialize;
use std::ops::AddAssign;
use std::sync::Arc;

/// Counters for one tokenized line (or, summed, for a session).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineStats {
    /// Characters no rule and no default token claimed.
    pub stalls: usize,
    pub pushes: usize,
    pub pops: usize,
    /// Pops of the last frame, which reset the stack to its root.
    pub underflows: usize,
    /// Pushes refused because the stack was at its depth limit.
    pub overflows: usize,
}

impl AddAssign for LineStats {
    fn add_assign(&mut self, other: Self) {
        self.stalls += other.stalls;
        self.pushes += other.pushes;
        self.pops += other.pops;
        self.underflows += other.underflows;
        self.overflows += other.overflows;
    }
}

/// Output of [`Tokenizer::tokenize_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    /// Stack to pass to the next line.
    pub state: ContextStack,
    pub stats: LineStats,
}

impl LineTokens {
    pub fn into_parts(self) -> (Vec<Token>, ContextStack) {
        (self.tokens, self.state)
    }
}

/// Runs a compiled rule set over lines of text.
///
/// The tokenizer holds no per-document state; any number of documents can be
/// tokenized with one tokenizer, each carrying its own [`ContextStack`].
#[derive(Debug, Clone)]
pub struct Tokenizer<'g> {
    rules: &'g CompiledRuleSet,
    settings: TokenizerSettings,
    fallback: Arc<str>,
}

impl<'g> Tokenizer<'g> {
    pub fn new(rules: &'g CompiledRuleSet) -> Self {
        Self::with_settings(rules, TokenizerSettings::default())
    }

    pub fn with_settings(rules: &'g CompiledRuleSet, settings: TokenizerSettings) -> Self {
        let fallback = Arc::from(settings.fallback_token.as_str());
        Self {
            rules,
            settings,
            fallback,
        }
    }

    pub fn rules(&self) -> &'g CompiledRuleSet {
        self.rules
    }

    pub fn settings(&self) -> &TokenizerSettings {
        &self.settings
    }

    /// Stack for the first line of a document.
    pub fn initial_state(&self) -> ContextStack {
        ContextStack::new(self.rules.start())
    }

    /// Stack rooted at a named state other than `start`.
    pub fn state_for(&self, name: &str) -> Option<ContextStack> {
        self.rules.state_id(name).map(ContextStack::new)
    }

    /// A session starting at the entry state.
    pub fn session(&self) -> Session<'g> {
        Session::new(self.clone())
    }

    /// Tokenize one line, starting from `state`.
    ///
    /// `line` should not contain the line terminator.
    pub fn tokenize_line(&self, state: &ContextStack, line: &str) -> LineTokens {
        let mut stack = state.clone();
        let mut sink = TokenSink::new(line, self.settings.merge_unmatched);
        let mut stats = LineStats::default();
        let mut pos = 0;
        let mut zero_width_steps = 0;

        while pos < line.len() {
            let current = self.rules.state(stack.top());
            let allow_zero_width = zero_width_steps < self.settings.max_zero_width_steps;

            if let Some((rule, m)) = find_match(current, line, pos, allow_zero_width) {
                let gap = current.default_token.as_ref().unwrap_or(&self.fallback);
                sink.emit_match(&rule.tokens, &m, gap);
                self.apply(&mut stack, rule.transition, &mut stats);

                zero_width_steps = if m.is_empty() { zero_width_steps + 1 } else { 0 };
                pos = m.end;
                continue;
            }

            let width = line
                .get(pos..)
                .and_then(|rest| rest.chars().next())
                .map_or(1, char::len_utf8);
            let span = pos..pos + width;
            match &current.default_token {
                Some(kind) => sink.emit_unmatched(kind, span),
                None => {
                    stats.stalls += 1;
                    tracing::trace!(
                        offset = pos,
                        state = stack.top().index(),
                        "no rule matched, using fallback token"
                    );
                    sink.emit_unmatched(&self.fallback, span);
                }
            }
            zero_width_steps = 0;
            pos += width;
        }

        LineTokens {
            tokens: sink.finish(),
            state: stack,
            stats,
        }
    }

    fn apply(&self, stack: &mut ContextStack, transition: Transition, stats: &mut LineStats) {
        match transition {
            Transition::Stay => {}
            Transition::Pop => {
                if stack.pop() {
                    stats.pops += 1;
                } else {
                    stats.underflows += 1;
                }
            }
            Transition::Goto(state) => stack.replace_top(state),
            Transition::Push(state) => {
                if stack.depth() < self.settings.max_stack_depth {
                    stack.push(state);
                    stats.pushes += 1;
                } else {
                    stats.overflows += 1;
                    tracing::warn!(
                        depth = stack.depth(),
                        limit = self.settings.max_stack_depth,
                        "context stack limit reached, push ignored"
                    );
                }
            }
        }
    }
}

/// First rule of `state` matching at `pos`. Zero-width matches only count
/// when they change the stack, and only while `allow_zero_width` holds.
fn find_match<'r>(
    state: &'r CompiledState,
    line: &str,
    pos: usize,
    allow_zero_width: bool,
) -> Option<(&'r CompiledRule, PatternMatch)> {
    state.rules.iter().find_map(|rule| {
        let m = rule.pattern.match_at(line, pos)?;
        if m.is_empty() && (rule.transition == Transition::Stay || !allow_zero_width) {
            return None;
        }
        Some((rule, m))
    })
}
