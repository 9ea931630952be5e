//! Stateful matchers over an incrementally delivered sequence of log lines.
//!
//! A matcher is fed one line at a time and reports whether its condition
//! has been met. Satisfaction is monotonic: once a matcher reports `true` it
//! keeps reporting `true`, and further lines are ignored.
//!
//! Composite matchers hold their sub-matchers as [`Matcher`] values, so any
//! kind of matcher can be nested inside any other.

use std::fmt;

use regex::Regex;

use crate::error::{LogsError, Result};

/// Capability shared by every matcher kind.
pub trait LineMatcher: fmt::Display {
    /// Presents one newly arrived line. Returns whether the matcher is now
    /// (or already was) satisfied.
    fn feed(&mut self, line: &str) -> bool;

    /// Returns whether the matcher has been satisfied, without feeding it.
    fn is_satisfied(&self) -> bool;

    /// Describes the leaf matchers still waiting for a line.
    ///
    /// Empty once the matcher is satisfied.
    fn unsatisfied(&self) -> Vec<String>;
}

/// Matches a line exactly equal to the expected text.
#[derive(Debug, Clone)]
pub struct EqualsMatcher {
    expected: String,
    satisfied: bool,
}

impl EqualsMatcher {
    /// Creates a matcher for lines equal to `expected`.
    #[must_use]
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            satisfied: false,
        }
    }

    /// The text a line must equal.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }
}

impl LineMatcher for EqualsMatcher {
    fn feed(&mut self, line: &str) -> bool {
        if !self.satisfied && line == self.expected {
            self.satisfied = true;
        }
        self.satisfied
    }

    fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    fn unsatisfied(&self) -> Vec<String> {
        leaf_unsatisfied(self, self.satisfied)
    }
}

impl fmt::Display for EqualsMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EqualsMatcher({:?})", self.expected)
    }
}

/// Matches a line containing a match for a regular expression.
///
/// The pattern is searched for anywhere in the line; use `^` and `$` to
/// anchor it.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    satisfied: bool,
}

impl RegexMatcher {
    /// Compiles `pattern` into a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`LogsError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| LogsError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self::from_regex(regex))
    }

    /// Wraps an already compiled regex.
    #[must_use]
    pub const fn from_regex(regex: Regex) -> Self {
        Self {
            regex,
            satisfied: false,
        }
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl LineMatcher for RegexMatcher {
    fn feed(&mut self, line: &str) -> bool {
        if !self.satisfied && self.regex.is_match(line) {
            self.satisfied = true;
        }
        self.satisfied
    }

    fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    fn unsatisfied(&self) -> Vec<String> {
        leaf_unsatisfied(self, self.satisfied)
    }
}

impl fmt::Display for RegexMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegexMatcher({:?})", self.regex.as_str())
    }
}

/// Satisfied once each sub-matcher has been satisfied, in declared order.
///
/// Lines are forwarded only to the sub-matcher at the cursor. A line that
/// does not advance the cursor is dropped; it is never retried against an
/// earlier or later sub-matcher. Sub-matchers that are already satisfied
/// are stepped over without consuming a line.
#[derive(Debug, Clone)]
pub struct OrderedLinesMatcher {
    matchers: Vec<Matcher>,
    position: usize,
}

impl OrderedLinesMatcher {
    /// Creates a matcher over `matchers` in the given order.
    #[must_use]
    pub fn new(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let mut this = Self {
            matchers: matchers.into_iter().collect(),
            position: 0,
        };
        this.skip_satisfied();
        this
    }

    /// Matches the given lines by equality, in order.
    #[must_use]
    pub fn by_equality<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(|l| EqualsMatcher::new(l).into()))
    }

    /// Matches the given regex patterns, in order.
    ///
    /// # Errors
    ///
    /// Returns [`LogsError::InvalidPattern`] for the first pattern that does
    /// not compile.
    pub fn by_regex<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = compile_all(patterns)?;
        Ok(Self::new(matchers))
    }

    /// Number of sub-matchers already satisfied.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    fn skip_satisfied(&mut self) {
        while self
            .matchers
            .get(self.position)
            .is_some_and(LineMatcher::is_satisfied)
        {
            self.position += 1;
        }
    }
}

impl LineMatcher for OrderedLinesMatcher {
    fn feed(&mut self, line: &str) -> bool {
        let Some(current) = self.matchers.get_mut(self.position) else {
            return true;
        };
        if current.feed(line) {
            tracing::debug!(matcher = %current, position = self.position, "ordered step matched");
            self.position += 1;
            self.skip_satisfied();
        }
        self.is_satisfied()
    }

    fn is_satisfied(&self) -> bool {
        self.position >= self.matchers.len()
    }

    fn unsatisfied(&self) -> Vec<String> {
        self.matchers[self.position.min(self.matchers.len())..]
            .iter()
            .flat_map(Matcher::unsatisfied)
            .collect()
    }
}

impl fmt::Display for OrderedLinesMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (matched, unmatched) = self.matchers.split_at(self.position.min(self.matchers.len()));
        write!(
            f,
            "OrderedLinesMatcher(matched=[{}], unmatched=[{}])",
            join(matched),
            join(unmatched)
        )
    }
}

/// Satisfied once every sub-matcher has been satisfied, in any order.
///
/// Each line is offered to the outstanding sub-matchers in declared order.
/// The first one it satisfies is retired and the line goes no further, so a
/// single line satisfies at most one sub-matcher. Sub-matchers that are
/// already satisfied start out retired.
#[derive(Debug, Clone)]
pub struct UnorderedLinesMatcher {
    matched: Vec<Matcher>,
    unmatched: Vec<Matcher>,
}

impl UnorderedLinesMatcher {
    /// Creates a matcher over `matchers`.
    #[must_use]
    pub fn new(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let (matched, unmatched) = matchers.into_iter().partition(LineMatcher::is_satisfied);
        Self { matched, unmatched }
    }

    /// Matches the given lines by equality, in any order.
    #[must_use]
    pub fn by_equality<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(|l| EqualsMatcher::new(l).into()))
    }

    /// Matches the given regex patterns, in any order.
    ///
    /// # Errors
    ///
    /// Returns [`LogsError::InvalidPattern`] for the first pattern that does
    /// not compile.
    pub fn by_regex<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = compile_all(patterns)?;
        Ok(Self::new(matchers))
    }
}

impl LineMatcher for UnorderedLinesMatcher {
    fn feed(&mut self, line: &str) -> bool {
        if let Some(idx) = self.unmatched.iter_mut().position(|m| m.feed(line)) {
            let done = self.unmatched.remove(idx);
            tracing::debug!(matcher = %done, remaining = self.unmatched.len(), "unordered entry matched");
            self.matched.push(done);
        }
        self.is_satisfied()
    }

    fn is_satisfied(&self) -> bool {
        self.unmatched.is_empty()
    }

    fn unsatisfied(&self) -> Vec<String> {
        self.unmatched.iter().flat_map(Matcher::unsatisfied).collect()
    }
}

impl fmt::Display for UnorderedLinesMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UnorderedLinesMatcher(matched=[{}], unmatched=[{}])",
            join(&self.matched),
            join(&self.unmatched)
        )
    }
}

/// Satisfied as soon as any one of its sub-matchers is.
#[derive(Debug, Clone)]
pub struct AnyMatcher {
    matchers: Vec<Matcher>,
    winner: Option<usize>,
}

impl AnyMatcher {
    /// Creates a matcher satisfied by whichever of `matchers` completes first.
    #[must_use]
    pub fn new(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Vec<Matcher> = matchers.into_iter().collect();
        let winner = matchers.iter().position(LineMatcher::is_satisfied);
        Self { matchers, winner }
    }

    /// Index of the sub-matcher that satisfied this one, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<usize> {
        self.winner
    }
}

impl LineMatcher for AnyMatcher {
    fn feed(&mut self, line: &str) -> bool {
        if self.winner.is_none() {
            // Every alternative sees the line so composite ones keep progressing.
            for (idx, m) in self.matchers.iter_mut().enumerate() {
                if m.feed(line) && self.winner.is_none() {
                    self.winner = Some(idx);
                }
            }
        }
        self.is_satisfied()
    }

    fn is_satisfied(&self) -> bool {
        self.winner.is_some()
    }

    fn unsatisfied(&self) -> Vec<String> {
        leaf_unsatisfied(self, self.is_satisfied())
    }
}

impl fmt::Display for AnyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyMatcher([{}])", join(&self.matchers))
    }
}

/// Closed set of matcher kinds.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact line equality.
    Equals(EqualsMatcher),
    /// Regex search.
    Regex(RegexMatcher),
    /// Sub-matchers satisfied in declared order.
    Ordered(OrderedLinesMatcher),
    /// Sub-matchers satisfied in any order.
    Unordered(UnorderedLinesMatcher),
    /// Any one sub-matcher satisfied.
    Any(AnyMatcher),
}

impl Matcher {
    /// Shorthand for an [`EqualsMatcher`].
    #[must_use]
    pub fn equals(expected: impl Into<String>) -> Self {
        Self::Equals(EqualsMatcher::new(expected))
    }

    /// Shorthand for a [`RegexMatcher`].
    ///
    /// # Errors
    ///
    /// Returns [`LogsError::InvalidPattern`] if the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        RegexMatcher::new(pattern).map(Self::Regex)
    }

    fn inner(&self) -> &dyn LineMatcher {
        match self {
            Self::Equals(m) => m,
            Self::Regex(m) => m,
            Self::Ordered(m) => m,
            Self::Unordered(m) => m,
            Self::Any(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn LineMatcher {
        match self {
            Self::Equals(m) => m,
            Self::Regex(m) => m,
            Self::Ordered(m) => m,
            Self::Unordered(m) => m,
            Self::Any(m) => m,
        }
    }
}

impl LineMatcher for Matcher {
    fn feed(&mut self, line: &str) -> bool {
        self.inner_mut().feed(line)
    }

    fn is_satisfied(&self) -> bool {
        self.inner().is_satisfied()
    }

    fn unsatisfied(&self) -> Vec<String> {
        self.inner().unsatisfied()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

impl From<EqualsMatcher> for Matcher {
    fn from(m: EqualsMatcher) -> Self {
        Self::Equals(m)
    }
}

impl From<RegexMatcher> for Matcher {
    fn from(m: RegexMatcher) -> Self {
        Self::Regex(m)
    }
}

impl From<OrderedLinesMatcher> for Matcher {
    fn from(m: OrderedLinesMatcher) -> Self {
        Self::Ordered(m)
    }
}

impl From<UnorderedLinesMatcher> for Matcher {
    fn from(m: UnorderedLinesMatcher) -> Self {
        Self::Unordered(m)
    }
}

impl From<AnyMatcher> for Matcher {
    fn from(m: AnyMatcher) -> Self {
        Self::Any(m)
    }
}

fn leaf_unsatisfied(m: &dyn fmt::Display, satisfied: bool) -> Vec<String> {
    if satisfied {
        Vec::new()
    } else {
        vec![m.to_string()]
    }
}

fn compile_all<I, S>(patterns: I) -> Result<Vec<Matcher>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| Matcher::regex(p.as_ref()))
        .collect()
}

fn join(matchers: &[Matcher]) -> String {
    matchers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
