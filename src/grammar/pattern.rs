//! Compiled rule patterns
//!
//! A thin wrapper around an Oniguruma regex that knows how many capturing
//! groups it has and only ever matches anchored at a given byte offset.
//! Lookbehind still sees the text before the offset.

use onig::{Regex, RegexOptions, Region, SearchOptions, Syntax};
use std::fmt;
use std::ops::Range;

/// Result of an anchored match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Byte offset where the match starts (the offset it was anchored at).
    pub start: usize,
    /// Byte offset one past the end of the match.
    pub end: usize,
    /// Span of each capturing group, in group order.
    /// `None` for groups that did not participate in the match.
    pub groups: Vec<Option<Range<usize>>>,
}

impl PatternMatch {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A compiled regex, matched anchored at the scan position.
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
    group_count: usize,
}

impl Pattern {
    /// Compile `source`. Plain `(...)` groups always capture, even when the
    /// pattern also uses named groups.
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self, onig::Error> {
        let mut options = RegexOptions::REGEX_OPTION_CAPTURE_GROUP;
        if case_insensitive {
            options |= RegexOptions::REGEX_OPTION_IGNORECASE;
        }
        let regex = Regex::with_options(source, options, Syntax::default())?;
        let group_count = regex.captures_len();

        Ok(Self {
            source: source.to_string(),
            case_insensitive,
            regex,
            group_count,
        })
    }

    /// Try to match at exactly `at`. Never searches forward.
    pub fn match_at(&self, line: &str, at: usize) -> Option<PatternMatch> {
        if at > line.len() {
            return None;
        }

        let mut region = Region::new();
        let len = self.regex.match_with_options(
            line,
            at,
            SearchOptions::SEARCH_OPTION_NONE,
            Some(&mut region),
        )?;

        let groups = (1..=self.group_count)
            .map(|i| region.pos(i).map(|(start, end)| start..end))
            .collect();

        Some(PatternMatch {
            start: at,
            end: at + len,
            groups,
        })
    }

    /// Number of capturing groups (not counting the whole match).
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("case_insensitive", &self.case_insensitive)
            .field("group_count", &self.group_count)
            .finish()
    }
}
