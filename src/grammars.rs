//! Grammars shipped with the crate.
//!
//! Each grammar is embedded as JSON and compiled the first time it is asked
//! for; the compiled rule set then lives for the rest of the process.

use crate::error::ConfigError;
use crate::grammar::{load_rule_set, CompiledRuleSet, RawRuleSet};
use once_cell::sync::Lazy;

const STRINGTEMPLATE_JSON: &str = include_str!("../grammars/stringtemplate.json");

static STRINGTEMPLATE: Lazy<Result<CompiledRuleSet, ConfigError>> =
    Lazy::new(|| RawRuleSet::from_json(STRINGTEMPLATE_JSON).and_then(|raw| load_rule_set(&raw)));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundledGrammar {
    /// StringTemplate templates with `$...$` delimiters. Start a session at
    /// `#angle` for `<...>` delimiters.
    StringTemplate,
}

impl BundledGrammar {
    pub const ALL: [BundledGrammar; 1] = [BundledGrammar::StringTemplate];

    /// Short name used on the command line.
    pub fn id(self) -> &'static str {
        match self {
            BundledGrammar::StringTemplate => "stringtemplate",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BundledGrammar::StringTemplate => "StringTemplate",
        }
    }

    pub fn scope_name(self) -> &'static str {
        match self {
            BundledGrammar::StringTemplate => "text.stringtemplate",
        }
    }

    /// The embedded JSON source.
    pub fn source(self) -> &'static str {
        match self {
            BundledGrammar::StringTemplate => STRINGTEMPLATE_JSON,
        }
    }

    /// The compiled rule set, compiled on first use.
    pub fn rules(self) -> Result<&'static CompiledRuleSet, ConfigError> {
        let compiled = match self {
            BundledGrammar::StringTemplate => &*STRINGTEMPLATE,
        };
        compiled.as_ref().map_err(Clone::clone)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.id() == id)
    }
}

/// The bundled StringTemplate rule set.
pub fn stringtemplate() -> Result<&'static CompiledRuleSet, ConfigError> {
    BundledGrammar::StringTemplate.rules()
}
