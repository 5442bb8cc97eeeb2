use regex::{Captures, Regex};

use crate::Node;

/// Builds a node from a successful pattern match.
///
/// Receives the full source (so children can be re-parsed in place), the
/// captures, and the current parse depth. Returns the absolute end of the
/// consumed span and the node, or `None` to reject the match outright.
pub(crate) type Build = fn(&str, &Captures<'_>, u8) -> Option<(usize, Node)>;

/// A single priority-ordered matcher.
///
/// Matchers search a window of the source and report the earliest occurrence
/// they can claim; the aggregate in [`crate::parser`] keeps the match with the
/// smallest start index, breaking ties toward the earliest-registered matcher.
pub(crate) enum Matcher {
    /// Matches a literal string.
    Exact {
        /// The literal to search for.
        needle: &'static str,
        /// Converts the needle into a node.
        build: fn(&str) -> Node,
    },
    /// Matches a compiled pattern.
    Pattern {
        /// The pattern to search with.
        regex: Regex,
        /// Converts the captures into a node.
        build: Build,
    },
}

impl Matcher {
    /// Creates a literal matcher.
    pub fn exact(needle: &'static str, build: fn(&str) -> Node) -> Self {
        Self::Exact { needle, build }
    }

    /// Creates a pattern matcher.
    ///
    /// The pattern is compiled eagerly; all patterns are fixed at build time
    /// and known to be valid.
    #[allow(clippy::unwrap_used)]
    pub fn pattern(pattern: &str, build: Build) -> Self {
        Self::Pattern { regex: Regex::new(pattern).unwrap(), build }
    }

    /// Searches `source[from..end]` for this matcher's earliest occurrence.
    ///
    /// Anchors behave as if the whole source were visible: `^` under `(?m)`
    /// only matches at the true start of the source or after a newline, never
    /// at an arbitrary window boundary.
    pub fn try_match(
        &self,
        source: &str,
        from: usize,
        end: usize,
        depth: u8,
    ) -> Option<(usize, usize, Node)> {
        match self {
            Self::Exact { needle, build } => {
                let start = from + source[from..end].find(needle)?;

                Some((start, start + needle.len(), build(needle)))
            }
            Self::Pattern { regex, build } => {
                let captures = regex.captures_at(&source[..end], from)?;
                let start = captures.get(0).map_or(from, |m| m.start());
                let (consumed_until, node) = build(source, &captures, depth)?;

                Some((start, consumed_until, node))
            }
        }
    }
}
