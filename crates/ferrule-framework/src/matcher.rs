//! Route matching rules.
//!
//! Every route and sub-router gate owns a [`Matcher`]. There are two kinds:
//!
//! - [`Matcher::Keyword`]: a command keyword. The compiled expression is
//!   built by [`keyword_pattern`]: anchored at the start of the search text,
//!   preceded by the owning router's prefix and followed by a boundary (any
//!   whitespace or end of text). `play` therefore matches `play x` and `play`
//!   but never `playlist`.
//! - [`Matcher::Pattern`]: a caller-supplied regular expression used exactly
//!   as given. No anchor, prefix or boundary is injected.
//!
//! Patterns are compiled once, when the matcher is created.

use std::ops::Range;

use regex::Regex;

use crate::error::{RouterError, RouterResult};

/// Trailing assertion appended to every keyword pattern.
pub const BOUNDARY: &str = r"(?:\s|$)";

/// Builds the expression for a keyword matcher.
///
/// The keyword may itself be a regular expression (e.g. `play|p`); it is
/// wrapped in a group so alternation stays inside the anchor and boundary.
///
/// ```rust
/// use ferrule_framework::matcher::keyword_pattern;
///
/// assert_eq!(keyword_pattern("", "ping"), r"^(?:ping)(?:\s|$)");
/// assert_eq!(keyword_pattern(" ", "add"), r"^ (?:add)(?:\s|$)");
/// ```
pub fn keyword_pattern(prefix: &str, keyword: &str) -> String {
    format!("^{prefix}(?:{keyword}){BOUNDARY}")
}

/// Builds the expression for a sub-router gate keyword.
///
/// Unlike [`keyword_pattern`] the gate must not consume the whitespace after
/// the keyword, since the child router's prefix (a single space by default)
/// expects it. A word boundary keeps `config` from opening on `configure`.
pub fn gate_pattern(keyword: &str) -> String {
    format!(r"^(?:{keyword})\b")
}

fn compile(pattern: &str) -> RouterResult<Regex> {
    Regex::new(pattern).map_err(|source| RouterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// A compiled matching rule.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// A command keyword wrapped by [`keyword_pattern`].
    Keyword {
        /// The keyword as registered.
        keyword: String,
        regex: Regex,
    },
    /// A raw regular expression.
    Pattern(Regex),
}

impl Matcher {
    /// Compiles a keyword matcher under `prefix`.
    pub fn keyword(prefix: &str, keyword: &str) -> RouterResult<Self> {
        Ok(Self::Keyword {
            keyword: keyword.to_string(),
            regex: compile(&keyword_pattern(prefix, keyword))?,
        })
    }

    /// Compiles a sub-router gate for `keyword` (see [`gate_pattern`]).
    pub fn gate(keyword: &str) -> RouterResult<Self> {
        Ok(Self::Keyword {
            keyword: keyword.to_string(),
            regex: compile(&gate_pattern(keyword))?,
        })
    }

    /// Compiles a raw pattern matcher.
    pub fn pattern(pattern: &str) -> RouterResult<Self> {
        Ok(Self::Pattern(compile(pattern)?))
    }

    fn regex(&self) -> &Regex {
        match self {
            Self::Keyword { regex, .. } | Self::Pattern(regex) => regex,
        }
    }

    /// Byte range of the first match in `text`.
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        self.regex().find(text).map(|m| m.range())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex().is_match(text)
    }

    /// The compiled expression text.
    pub fn as_str(&self) -> &str {
        self.regex().as_str()
    }

    /// The text a route built from this matcher is named after by default.
    pub fn source(&self) -> &str {
        match self {
            Self::Keyword { keyword, .. } => keyword,
            Self::Pattern(regex) => regex.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_boundary() {
        let m = Matcher::keyword("", "play").unwrap();
        assert_eq!(m.find("play"), Some(0..4));
        assert_eq!(m.find("play song"), Some(0..5));
        assert_eq!(m.find("play\tsong"), Some(0..5));
        assert!(!m.is_match("playlist"));
        assert!(!m.is_match("replay"));
        assert!(!m.is_match(" play"));
    }

    #[test]
    fn test_keyword_alternation_stays_anchored() {
        let m = Matcher::keyword("", "music|m").unwrap();
        assert!(m.is_match("m play"));
        assert!(m.is_match("music"));
        assert!(!m.is_match("xm"));
        assert!(!m.is_match("mute"));
    }

    #[test]
    fn test_keyword_with_prefix() {
        let m = Matcher::keyword(" ", "add").unwrap();
        assert_eq!(m.find(" add milk"), Some(0..5));
        assert!(!m.is_match("add milk"));
        assert_eq!(m.source(), "add");
    }

    #[test]
    fn test_gate_leaves_separator() {
        let m = Matcher::gate("config").unwrap();
        assert_eq!(m.find("config prefix ?"), Some(0..6));
        assert_eq!(m.find("config"), Some(0..6));
        assert!(!m.is_match("configure"));
    }

    #[test]
    fn test_pattern_is_unmodified() {
        let m = Matcher::pattern("hello|hi").unwrap();
        assert_eq!(m.as_str(), "hello|hi");
        assert_eq!(m.find("oh hi there"), Some(3..5));
        assert!(m.is_match("hiking"));
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let err = Matcher::keyword("", "bad(").unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
        assert!(Matcher::pattern("[unclosed").is_err());
    }
}
