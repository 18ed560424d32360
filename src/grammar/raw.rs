//! Raw rule sets, as written by grammar authors.
//!
//! The shapes mirror the JSON a grammar author writes:
//!
//! ```text
//! {
//!   "start": [
//!     { "token": "comment.begin", "regex": "/\\*",
//!       "push": [ { "token": "comment.end", "regex": "\\*/", "next": "pop" },
//!                 { "defaultToken": "comment" } ] },
//!     { "include": "#keywords" }
//!   ],
//!   "#keywords": [ { "token": ["kw", "op"], "regex": "(if)(\\()" } ]
//! }
//! ```
//!
//! Nothing here is validated; see [`load_rule_set`](super::load_rule_set).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token assignment of a rule: one type for the whole match, or one per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenSpec {
    Single(String),
    Groups(Vec<String>),
}

/// Target of a `push`: an inline (anonymous) rule list or a named state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PushSpec {
    Rules(Vec<RawRule>),
    State(String),
}

/// One entry of a state's rule list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<PushSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_insensitive: Option<bool>,
    /// Free text for grammar authors; the engine ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RawRule {
    /// A matching rule emitting one token type for the whole match.
    pub fn token(token: &str, regex: &str) -> Self {
        Self {
            token: Some(TokenSpec::Single(token.to_string())),
            regex: Some(regex.to_string()),
            ..Self::default()
        }
    }

    /// A matching rule emitting one token type per capturing group.
    pub fn groups(tokens: &[&str], regex: &str) -> Self {
        Self {
            token: Some(TokenSpec::Groups(
                tokens.iter().map(|t| t.to_string()).collect(),
            )),
            regex: Some(regex.to_string()),
            ..Self::default()
        }
    }

    pub fn include(state: &str) -> Self {
        Self {
            include: Some(state.to_string()),
            ..Self::default()
        }
    }

    pub fn default_token(token: &str) -> Self {
        Self {
            default_token: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn with_next(mut self, next: &str) -> Self {
        self.next = Some(next.to_string());
        self
    }

    pub fn with_push(mut self, rules: Vec<RawRule>) -> Self {
        self.push = Some(PushSpec::Rules(rules));
        self
    }

    pub fn with_push_state(mut self, state: &str) -> Self {
        self.push = Some(PushSpec::State(state.to_string()));
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = Some(true);
        self
    }

    /// True for entries that only carry a `defaultToken`.
    pub fn is_default_token(&self) -> bool {
        self.default_token.is_some()
    }
}

/// Mapping from state name to its ordered rule list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRuleSet {
    pub states: BTreeMap<String, Vec<RawRule>>,
}

impl RawRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a named state.
    pub fn with_state(mut self, name: &str, rules: Vec<RawRule>) -> Self {
        self.states.insert(name.to_string(), rules);
        self
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&[RawRule]> {
        self.states.get(name).map(|rules| rules.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }
}
