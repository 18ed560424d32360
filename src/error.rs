//! Load-time errors for rule sets.
//!
//! Everything that can go wrong with a grammar is detected while loading it.
//! Once a [`CompiledRuleSet`](crate::grammar::CompiledRuleSet) exists,
//! tokenization cannot fail.

use thiserror::Error;

/// A rule set could not be loaded.
///
/// Loading is all-or-nothing: there is no partially loaded rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The input could not be deserialized into a rule set.
    #[error("failed to parse rule set: {0}")]
    Parse(String),

    /// A rule has an invalid combination of fields.
    #[error("rule {index} in state `{state}`: {reason}")]
    MalformedRule {
        state: String,
        index: usize,
        reason: String,
    },

    /// A token list does not line up with the capturing groups of its regex.
    #[error(
        "rule {index} in state `{state}`: {tokens} token types for {groups} capturing groups in `{regex}`"
    )]
    GroupCountMismatch {
        state: String,
        index: usize,
        regex: String,
        tokens: usize,
        groups: usize,
    },

    /// The regex engine rejected a pattern.
    #[error("rule {index} in state `{state}`: invalid regex `{regex}`: {message}")]
    InvalidRegex {
        state: String,
        index: usize,
        regex: String,
        message: String,
    },

    /// An `include` names a state that does not exist.
    #[error("state `{state}` includes unknown state `{target}`")]
    UnknownInclude { state: String, target: String },

    /// Include resolution came back to a state it was still resolving.
    #[error("circular include: {}", .cycle.join(" -> "))]
    CircularInclude { cycle: Vec<String> },

    /// A `next` or `push` names a state that does not exist.
    #[error("rule {index} in state `{state}` transitions to unknown state `{target}`")]
    UnknownState {
        state: String,
        index: usize,
        target: String,
    },

    /// The rule set has no entry state.
    #[error("rule set has no `{0}` state")]
    MissingStartState(String),
}

impl ConfigError {
    pub(crate) fn malformed(state: &str, index: usize, reason: impl Into<String>) -> Self {
        ConfigError::MalformedRule {
            state: state.to_string(),
            index,
            reason: reason.into(),
        }
    }
}
