//! Include resolution
//!
//! Splices the rules of included states into the including list. Each named
//! state moves through `Unresolved -> Resolving -> Resolved`; meeting a state
//! that is still `Resolving` means the include graph has a cycle. Resolved
//! lists are cached, so a state included from several places (a diamond) is
//! resolved once and shared by every includer.
//!
//! Push lists are not followed here. They are resolved on their own when the
//! compiler turns them into anonymous states, by which point every named state
//! they include is already resolved.

use super::raw::{RawRule, RawRuleSet};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::rc::Rc;

/// A matching rule together with where it was written.
#[derive(Debug, Clone)]
pub(crate) struct RuleRef<'a> {
    /// Name of the state (or label of the push list) that contains the rule.
    pub owner: Rc<str>,
    /// Position of the rule in its owner's raw list.
    pub index: usize,
    pub rule: &'a RawRule,
}

/// A rule list with every include spliced in and default-token entries
/// pulled out.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedList<'a> {
    pub rules: Vec<RuleRef<'a>>,
    pub default_token: Option<&'a str>,
}

#[derive(Debug, Clone)]
enum Resolution<'a> {
    Unresolved,
    Resolving,
    Resolved(Rc<ResolvedList<'a>>),
}

pub(crate) struct IncludeResolver<'a> {
    raw: &'a RawRuleSet,
    status: HashMap<&'a str, Resolution<'a>>,
    /// Named states currently being resolved, outermost first.
    path: Vec<&'a str>,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(raw: &'a RawRuleSet) -> Self {
        let status = raw
            .states
            .keys()
            .map(|name| (name.as_str(), Resolution::Unresolved))
            .collect();

        Self {
            raw,
            status,
            path: Vec::new(),
        }
    }

    /// Resolve a named state. `from` names the includer, for error messages.
    pub fn resolve(&mut self, name: &str, from: &str) -> Result<Rc<ResolvedList<'a>>, ConfigError> {
        let raw = self.raw;
        let (key, rules) = raw.states.get_key_value(name).ok_or_else(|| {
            ConfigError::UnknownInclude {
                state: from.to_string(),
                target: name.to_string(),
            }
        })?;
        let key = key.as_str();

        match self.status.get(key) {
            Some(Resolution::Resolved(list)) => return Ok(Rc::clone(list)),
            Some(Resolution::Resolving) => {
                let first = self.path.iter().position(|s| *s == key).unwrap_or(0);
                let mut cycle: Vec<String> =
                    self.path[first..].iter().map(|s| s.to_string()).collect();
                cycle.push(key.to_string());
                return Err(ConfigError::CircularInclude { cycle });
            }
            Some(Resolution::Unresolved) | None => {}
        }

        self.status.insert(key, Resolution::Resolving);
        self.path.push(key);
        let resolved = self.resolve_list(Rc::from(key), rules);
        self.path.pop();

        let list = Rc::new(resolved?);
        self.status.insert(key, Resolution::Resolved(Rc::clone(&list)));
        Ok(list)
    }

    /// Resolve a rule list owned by `owner` (a state name or a push-list label).
    pub fn resolve_list(
        &mut self,
        owner: Rc<str>,
        rules: &'a [RawRule],
    ) -> Result<ResolvedList<'a>, ConfigError> {
        let mut resolved = ResolvedList::default();
        let mut inherited_default = None;

        for (index, rule) in rules.iter().enumerate() {
            if let Some(target) = &rule.include {
                check_include_shape(&owner, index, rule)?;
                let included = self.resolve(target, &owner)?;
                resolved.rules.extend(included.rules.iter().cloned());
                if inherited_default.is_none() {
                    inherited_default = included.default_token;
                }
            } else if let Some(token) = &rule.default_token {
                check_default_shape(&owner, index, rule)?;
                if resolved.default_token.is_none() {
                    resolved.default_token = Some(token.as_str());
                }
            } else {
                resolved.rules.push(RuleRef {
                    owner: Rc::clone(&owner),
                    index,
                    rule,
                });
            }
        }

        if resolved.default_token.is_none() {
            resolved.default_token = inherited_default;
        }
        Ok(resolved)
    }
}

fn check_include_shape(owner: &str, index: usize, rule: &RawRule) -> Result<(), ConfigError> {
    let extra = rule.token.is_some()
        || rule.regex.is_some()
        || rule.next.is_some()
        || rule.push.is_some()
        || rule.default_token.is_some()
        || rule.case_insensitive.is_some();
    if extra {
        return Err(ConfigError::malformed(
            owner,
            index,
            "`include` cannot be combined with other fields",
        ));
    }
    Ok(())
}

fn check_default_shape(owner: &str, index: usize, rule: &RawRule) -> Result<(), ConfigError> {
    let extra = rule.token.is_some()
        || rule.regex.is_some()
        || rule.next.is_some()
        || rule.push.is_some()
        || rule.case_insensitive.is_some();
    if extra {
        return Err(ConfigError::malformed(
            owner,
            index,
            "`defaultToken` cannot be combined with matching fields",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regexes(list: &ResolvedList<'_>) -> Vec<String> {
        list.rules
            .iter()
            .map(|r| r.rule.regex.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn splices_in_place() {
        let raw = RawRuleSet::new()
            .with_state(
                "start",
                vec![
                    RawRule::token("a", "a"),
                    RawRule::include("#mid"),
                    RawRule::token("z", "z"),
                ],
            )
            .with_state("#mid", vec![RawRule::token("m", "m"), RawRule::token("n", "n")]);

        let mut resolver = IncludeResolver::new(&raw);
        let list = resolver.resolve("start", "start").unwrap();
        assert_eq!(regexes(&list), vec!["a", "m", "n", "z"]);
        assert_eq!(&*list.rules[1].owner, "#mid");
        assert_eq!(list.rules[1].index, 0);
    }

    #[test]
    fn transitive_includes() {
        let raw = RawRuleSet::new()
            .with_state("start", vec![RawRule::include("#a")])
            .with_state("#a", vec![RawRule::include("#b"), RawRule::token("a", "a")])
            .with_state("#b", vec![RawRule::token("b", "b")]);

        let mut resolver = IncludeResolver::new(&raw);
        let list = resolver.resolve("start", "start").unwrap();
        assert_eq!(regexes(&list), vec!["b", "a"]);
    }

    #[test]
    fn diamond_resolves_shared_state_once() {
        let raw = RawRuleSet::new()
            .with_state("start", vec![RawRule::include("#a"), RawRule::include("#b")])
            .with_state("#a", vec![RawRule::include("#c")])
            .with_state("#b", vec![RawRule::include("#c")])
            .with_state("#c", vec![RawRule::token("c", "c")]);

        let mut resolver = IncludeResolver::new(&raw);
        let a = resolver.resolve("#a", "#a").unwrap();
        let b = resolver.resolve("#b", "#b").unwrap();
        let c = resolver.resolve("#c", "#c").unwrap();
        assert_eq!(regexes(&a), vec!["c"]);
        assert_eq!(regexes(&b), vec!["c"]);
        assert!(std::ptr::eq(a.rules[0].rule, c.rules[0].rule));

        let start = resolver.resolve("start", "start").unwrap();
        assert_eq!(regexes(&start), vec!["c", "c"]);
    }

    #[test]
    fn mutual_include_is_a_cycle() {
        let raw = RawRuleSet::new()
            .with_state("start", vec![RawRule::include("a")])
            .with_state("a", vec![RawRule::include("b")])
            .with_state("b", vec![RawRule::include("a")]);

        let mut resolver = IncludeResolver::new(&raw);
        let err = resolver.resolve("start", "start").unwrap_err();
        assert_eq!(
            err,
            ConfigError::CircularInclude {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }
        );
        assert!(err.to_string().contains("circular include"));
    }

    #[test]
    fn self_include_is_a_cycle() {
        let raw = RawRuleSet::new().with_state("start", vec![RawRule::include("start")]);
        let mut resolver = IncludeResolver::new(&raw);
        assert!(matches!(
            resolver.resolve("start", "start"),
            Err(ConfigError::CircularInclude { .. })
        ));
    }

    #[test]
    fn unknown_include_names_the_includer() {
        let raw = RawRuleSet::new().with_state("start", vec![RawRule::include("#missing")]);
        let mut resolver = IncludeResolver::new(&raw);
        assert_eq!(
            resolver.resolve("start", "start").unwrap_err(),
            ConfigError::UnknownInclude {
                state: "start".into(),
                target: "#missing".into()
            }
        );
    }

    #[test]
    fn own_default_token_wins_over_included() {
        let raw = RawRuleSet::new()
            .with_state(
                "start",
                vec![RawRule::include("#inner"), RawRule::default_token("outer")],
            )
            .with_state("#inner", vec![RawRule::default_token("inner")])
            .with_state("#plain", vec![RawRule::include("#inner")]);

        let mut resolver = IncludeResolver::new(&raw);
        assert_eq!(
            resolver.resolve("start", "start").unwrap().default_token,
            Some("outer")
        );
        assert_eq!(
            resolver.resolve("#plain", "#plain").unwrap().default_token,
            Some("inner")
        );
    }

    #[test]
    fn include_with_extra_fields_is_malformed() {
        let mut rule = RawRule::include("#x");
        rule.regex = Some("x".into());
        let raw = RawRuleSet::new()
            .with_state("start", vec![rule])
            .with_state("#x", vec![]);

        let mut resolver = IncludeResolver::new(&raw);
        assert!(matches!(
            resolver.resolve("start", "start"),
            Err(ConfigError::MalformedRule { index: 0, .. })
        ));
    }

    #[test]
    fn push_lists_are_not_followed() {
        // The include inside the push list would be a cycle if it were spliced
        // into `start` itself.
        let raw = RawRuleSet::new().with_state(
            "start",
            vec![RawRule::token("open", "\\(").with_push(vec![RawRule::include("start")])],
        );

        let mut resolver = IncludeResolver::new(&raw);
        let list = resolver.resolve("start", "start").unwrap();
        assert_eq!(list.rules.len(), 1);
    }
}
