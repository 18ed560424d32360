//! Normalized, compiled rule sets.
//!
//! [`load_rule_set`] turns a [`RawRuleSet`] into a [`CompiledRuleSet`]:
//!
//! 1. every named state is given a [`StateId`] up front, so `next` and `push`
//!    can refer to states that come later,
//! 2. includes are spliced (see [`include`](super::include)),
//! 3. every rule is checked and its regex compiled once; identical patterns
//!    share one compiled regex,
//! 4. inline `push` lists become anonymous states in the same arena.
//!
//! The result is immutable and can be shared between any number of
//! tokenization sessions.

use super::include::{IncludeResolver, ResolvedList, RuleRef};
use super::pattern::Pattern;
use super::raw::{PushSpec, RawRule, RawRuleSet, TokenSpec};
use crate::error::ConfigError;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

/// Name of the entry state.
pub const START_STATE: &str = "start";

/// Index of a state in the compiled arena. Named and anonymous states share
/// one index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a match is turned into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAssign {
    /// One token spanning the whole match.
    Single(Arc<str>),
    /// One token per capturing group, in group order.
    Groups(Vec<Arc<str>>),
}

/// Effect of a match on the context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Pop,
    /// Replace the top of the stack.
    Goto(StateId),
    Push(StateId),
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub pattern: Arc<Pattern>,
    pub tokens: TokenAssign,
    pub transition: Transition,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledState {
    /// `None` for anonymous states created from inline `push` lists.
    pub name: Option<String>,
    pub rules: Vec<CompiledRule>,
    pub default_token: Option<Arc<str>>,
}

/// A fully resolved rule set, ready for tokenization.
#[derive(Debug)]
pub struct CompiledRuleSet {
    states: Vec<CompiledState>,
    names: BTreeMap<String, StateId>,
    start: StateId,
    pattern_count: usize,
}

impl CompiledRuleSet {
    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state(&self, id: StateId) -> &CompiledState {
        &self.states[id.0]
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    /// Named states, in name order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|name| name.as_str())
    }

    /// Number of states, anonymous ones included.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of distinct compiled regexes.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }
}

/// Load, resolve, validate and compile a raw rule set.
pub fn load_rule_set(raw: &RawRuleSet) -> Result<CompiledRuleSet, ConfigError> {
    if !raw.contains(START_STATE) {
        return Err(ConfigError::MissingStartState(START_STATE.to_string()));
    }

    let mut compiler = Compiler::new(raw);
    for name in raw.states.keys() {
        let id = compiler.reserve(Some(name.clone()));
        compiler.names.insert(name.clone(), id);
    }

    for name in raw.states.keys() {
        let id = compiler.names[name];
        let list = compiler.resolver.resolve(name, name)?;
        let (rules, default_token) = compiler.compile_list(&list)?;
        tracing::trace!(state = %name, rules = rules.len(), "compiled state");
        let state = &mut compiler.states[id.0];
        state.rules = rules;
        state.default_token = default_token;
    }

    let start = compiler.names[START_STATE];
    let rule_set = CompiledRuleSet {
        states: compiler.states,
        names: compiler.names,
        start,
        pattern_count: compiler.patterns.len(),
    };

    tracing::debug!(
        states = rule_set.state_count(),
        named = rule_set.names.len(),
        patterns = rule_set.pattern_count,
        "loaded rule set"
    );
    Ok(rule_set)
}

struct Compiler<'a> {
    resolver: IncludeResolver<'a>,
    states: Vec<CompiledState>,
    names: BTreeMap<String, StateId>,
    /// Inline push lists already turned into states, keyed by list address.
    anonymous: HashMap<usize, StateId>,
    patterns: HashMap<(String, bool), Arc<Pattern>>,
    token_names: HashMap<String, Arc<str>>,
}

impl<'a> Compiler<'a> {
    fn new(raw: &'a RawRuleSet) -> Self {
        Self {
            resolver: IncludeResolver::new(raw),
            states: Vec::new(),
            names: BTreeMap::new(),
            anonymous: HashMap::new(),
            patterns: HashMap::new(),
            token_names: HashMap::new(),
        }
    }

    fn reserve(&mut self, name: Option<String>) -> StateId {
        let id = StateId(self.states.len());
        self.states.push(CompiledState {
            name,
            ..CompiledState::default()
        });
        id
    }

    fn compile_list(
        &mut self,
        list: &ResolvedList<'a>,
    ) -> Result<(Vec<CompiledRule>, Option<Arc<str>>), ConfigError> {
        let rules = list
            .rules
            .iter()
            .map(|rule| self.compile_rule(rule))
            .collect::<Result<Vec<_>, _>>()?;
        let default_token = list.default_token.map(|t| self.intern(t));
        Ok((rules, default_token))
    }

    fn compile_rule(&mut self, rule_ref: &RuleRef<'a>) -> Result<CompiledRule, ConfigError> {
        let rule: &'a RawRule = rule_ref.rule;
        let (owner, index) = (rule_ref.owner.as_ref(), rule_ref.index);

        let (token, regex) = match (&rule.token, &rule.regex) {
            (Some(token), Some(regex)) => (token, regex),
            (None, Some(_)) => {
                return Err(ConfigError::malformed(owner, index, "`regex` without `token`"))
            }
            (Some(_), None) => {
                return Err(ConfigError::malformed(owner, index, "`token` without `regex`"))
            }
            (None, None) => {
                return Err(ConfigError::malformed(
                    owner,
                    index,
                    "rule needs `token` and `regex`, `include`, or `defaultToken`",
                ))
            }
        };
        if rule.next.is_some() && rule.push.is_some() {
            return Err(ConfigError::malformed(
                owner,
                index,
                "`next` and `push` cannot be combined",
            ));
        }

        let pattern = self.pattern(owner, index, regex, rule.case_insensitive.unwrap_or(false))?;

        let tokens = match token {
            TokenSpec::Single(name) => TokenAssign::Single(self.intern(name)),
            TokenSpec::Groups(names) if names.is_empty() => {
                return Err(ConfigError::malformed(owner, index, "empty `token` list"));
            }
            TokenSpec::Groups(names) => {
                if names.len() != pattern.group_count() {
                    return Err(ConfigError::GroupCountMismatch {
                        state: owner.to_string(),
                        index,
                        regex: regex.clone(),
                        tokens: names.len(),
                        groups: pattern.group_count(),
                    });
                }
                TokenAssign::Groups(names.iter().map(|n| self.intern(n)).collect())
            }
        };

        let transition = match (&rule.next, &rule.push) {
            (Some(next), None) if next == "pop" => Transition::Pop,
            (Some(next), None) => Transition::Goto(self.named(owner, index, next)?),
            (None, Some(PushSpec::State(name))) => Transition::Push(self.named(owner, index, name)?),
            (None, Some(PushSpec::Rules(rules))) => {
                let label = format!("{owner}/push@{index}");
                Transition::Push(self.anonymous(label, rules)?)
            }
            _ => Transition::Stay,
        };

        Ok(CompiledRule {
            pattern,
            tokens,
            transition,
        })
    }

    fn anonymous(
        &mut self,
        label: String,
        rules: &'a [RawRule],
    ) -> Result<StateId, ConfigError> {
        let key = rules.as_ptr() as usize;
        if let Some(id) = self.anonymous.get(&key) {
            return Ok(*id);
        }

        // Registered before compiling so a push list that reaches itself
        // through an include gets the same state.
        let id = self.reserve(None);
        self.anonymous.insert(key, id);

        let list = self.resolver.resolve_list(Rc::from(label.as_str()), rules)?;
        let (compiled, default_token) = self.compile_list(&list)?;
        let state = &mut self.states[id.0];
        state.rules = compiled;
        state.default_token = default_token;
        Ok(id)
    }

    fn named(&self, owner: &str, index: usize, name: &str) -> Result<StateId, ConfigError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownState {
                state: owner.to_string(),
                index,
                target: name.to_string(),
            })
    }

    fn pattern(
        &mut self,
        owner: &str,
        index: usize,
        regex: &str,
        case_insensitive: bool,
    ) -> Result<Arc<Pattern>, ConfigError> {
        let key = (regex.to_string(), case_insensitive);
        if let Some(pattern) = self.patterns.get(&key) {
            return Ok(Arc::clone(pattern));
        }

        let pattern = Pattern::new(regex, case_insensitive).map_err(|e| {
            ConfigError::InvalidRegex {
                state: owner.to_string(),
                index,
                regex: regex.to_string(),
                message: e.to_string(),
            }
        })?;
        let pattern = Arc::new(pattern);
        self.patterns.insert(key, Arc::clone(&pattern));
        Ok(pattern)
    }

    fn intern(&mut self, name: &str) -> Arc<str> {
        self.token_names
            .entry(name.to_string())
            .or_insert_with(|| Arc::from(name))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(value: serde_json::Value) -> Result<CompiledRuleSet, ConfigError> {
        load_rule_set(&RawRuleSet::from_value(value).unwrap())
    }

    #[test]
    fn missing_start_state() {
        let err = load(json!({"other": []})).unwrap_err();
        assert_eq!(err, ConfigError::MissingStartState("start".into()));
    }

    #[test]
    fn group_count_mismatch_fails_at_load() {
        let err = load(json!({
            "start": [{"token": ["kw", "op", "extra"], "regex": "(if)(\\()"}]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::GroupCountMismatch {
                state: "start".into(),
                index: 0,
                regex: "(if)(\\()".into(),
                tokens: 3,
                groups: 2,
            }
        );
    }

    #[test]
    fn group_count_checked_inside_push_lists_and_includes() {
        let err = load(json!({
            "start": [{"token": "open", "regex": "\\(", "push": [{"include": "#inner"}]}],
            "#inner": [{"token": ["a"], "regex": "a"}]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::GroupCountMismatch { ref state, groups: 0, tokens: 1, .. } if state == "#inner"
        ));
    }

    #[test]
    fn invalid_regex() {
        let err = load(json!({"start": [{"token": "x", "regex": "(unclosed"}]})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { index: 0, .. }));
    }

    #[test]
    fn malformed_rules() {
        let cases = [
            json!({"start": [{"regex": "a"}]}),
            json!({"start": [{"token": "a"}]}),
            json!({"start": [{"token": "a", "regex": "a", "next": "pop", "push": []}]}),
            json!({"start": [{"token": [], "regex": "a"}]}),
            json!({"start": [{"defaultToken": "x", "regex": "a"}]}),
            json!({"start": [{"comment": "nothing else"}]}),
        ];
        for case in cases {
            let err = load(case.clone()).unwrap_err();
            assert!(
                matches!(err, ConfigError::MalformedRule { .. }),
                "{case} gave {err:?}"
            );
        }
    }

    #[test]
    fn unknown_next_state() {
        let err = load(json!({"start": [{"token": "x", "regex": "x", "next": "nowhere"}]}))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownState {
                state: "start".into(),
                index: 0,
                target: "nowhere".into(),
            }
        );
    }

    #[test]
    fn transitions_are_resolved() {
        let rules = load(json!({
            "start": [
                {"token": "a", "regex": "a", "next": "other"},
                {"token": "b", "regex": "b", "push": "other"},
                {"token": "c", "regex": "c", "push": [{"token": "d", "regex": "d", "next": "pop"}]},
                {"token": "e", "regex": "e"}
            ],
            "other": []
        }))
        .unwrap();

        let other = rules.state_id("other").unwrap();
        let start = rules.state(rules.start());
        assert_eq!(start.rules[0].transition, Transition::Goto(other));
        assert_eq!(start.rules[1].transition, Transition::Push(other));
        assert_eq!(start.rules[3].transition, Transition::Stay);

        let Transition::Push(anon) = start.rules[2].transition else {
            panic!("expected a push");
        };
        let anon = rules.state(anon);
        assert_eq!(anon.name, None);
        assert_eq!(anon.rules[0].transition, Transition::Pop);
        assert_eq!(rules.state_count(), 3);
    }

    #[test]
    fn diamond_include_appears_in_both_states() {
        let rules = load(json!({
            "start": [{"include": "a"}],
            "a": [{"include": "c"}, {"token": "a", "regex": "a"}],
            "b": [{"include": "c"}],
            "c": [{"token": "c", "regex": "c"}]
        }))
        .unwrap();

        let a = rules.state(rules.state_id("a").unwrap());
        let b = rules.state(rules.state_id("b").unwrap());
        assert_eq!(a.rules.len(), 2);
        assert_eq!(b.rules.len(), 1);
        assert_eq!(a.rules[0].pattern.source(), "c");
        assert!(Arc::ptr_eq(&a.rules[0].pattern, &b.rules[0].pattern));
        assert_eq!(rules.pattern_count(), 2);
    }

    #[test]
    fn circular_include_is_rejected() {
        let err = load(json!({
            "start": [{"include": "a"}],
            "a": [{"include": "b"}],
            "b": [{"include": "a"}]
        }))
        .unwrap_err();
        assert!(err.to_string().starts_with("circular include"));
    }

    #[test]
    fn included_push_list_becomes_one_state() {
        let rules = load(json!({
            "start": [{"include": "#c"}],
            "other": [{"include": "#c"}],
            "#c": [{"token": "o", "regex": "\\(", "push": [{"token": "x", "regex": "\\)", "next": "pop"}]}]
        }))
        .unwrap();

        let from_start = rules.state(rules.start()).rules[0].transition;
        let from_other = rules.state(rules.state_id("other").unwrap()).rules[0].transition;
        assert_eq!(from_start, from_other);
        // start, other, #c and the single anonymous state
        assert_eq!(rules.state_count(), 4);
    }

    #[test]
    fn push_list_including_its_owner() {
        let raw = RawRuleSet::new().with_state(
            "start",
            vec![RawRule::token("open", "\\(").with_push(vec![
                RawRule::token("close", "\\)").with_next("pop"),
                RawRule::include("start"),
            ])],
        );
        let rules = load_rule_set(&raw).unwrap();

        let Transition::Push(anon) = rules.state(rules.start()).rules[0].transition else {
            panic!("expected a push");
        };
        let nested = &rules.state(anon).rules[1];
        assert_eq!(nested.transition, Transition::Push(anon));
    }

    #[test]
    fn default_token_and_case_flag() {
        let rules = load(json!({
            "start": [
                {"token": "kw", "regex": "select", "caseInsensitive": true},
                {"defaultToken": "plain"}
            ]
        }))
        .unwrap();
        let start = rules.state(rules.start());
        assert_eq!(start.default_token.as_deref(), Some("plain"));
        assert!(start.rules[0].pattern.is_case_insensitive());
    }

    #[test]
    fn compiled_rule_set_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledRuleSet>();
    }
}
