//! Rule sets: the raw form grammar authors write, and the compiled form the
//! tokenizer runs on.

pub mod compiled;
mod include;
pub mod pattern;
pub mod raw;

pub use compiled::{
    load_rule_set, CompiledRule, CompiledRuleSet, CompiledState, StateId, TokenAssign, Transition,
    START_STATE,
};
pub use pattern::{Pattern, PatternMatch};
pub use raw::{PushSpec, RawRule, RawRuleSet, TokenSpec};
