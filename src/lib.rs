//! # stlex
//!
//! A rule-based, stateful lexer engine for syntax highlighting.
//!
//! Grammars are tables of states, each an ordered list of regex rules. Rules
//! emit typed tokens, can push and pop states on a context stack, pull in the
//! rules of other states with `include`, and assign one token type per
//! capturing group. The stack is carried from line to line, so constructs
//! such as block comments can span lines.
//!
//! ```text
//! let rules = load_rule_set(&RawRuleSet::from_json(source)?)?;
//! let tokenizer = Tokenizer::new(&rules);
//! let out = tokenizer.tokenize_line(&tokenizer.initial_state(), "a /* b */ c");
//! ```
//!
//! A StringTemplate grammar is bundled in [`grammars`].

pub mod error;
pub mod grammar;
pub mod grammars;
pub mod settings;
pub mod tokenizer;

pub use error::ConfigError;
pub use grammar::{load_rule_set, CompiledRuleSet, RawRule, RawRuleSet};
pub use settings::TokenizerSettings;
pub use tokenizer::{detokenize, ContextStack, LineStats, LineTokens, Session, Token, Tokenizer};
