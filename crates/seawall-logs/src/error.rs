//! Errors raised while building matchers or waiting on log output.

use std::time::Duration;

use seawall_common::error::DecodeError;
use thiserror::Error;

/// Error type for the log matching engine.
#[derive(Debug, Error)]
pub enum LogsError {
    /// The time budget ran out before the matcher was satisfied.
    #[error(
        "timeout ({timeout:?}) waiting for logs matching {matcher} after {lines_seen} lines; unsatisfied: [{}]",
        .unsatisfied.join(", ")
    )]
    MatchTimeout {
        /// Configured time budget.
        timeout: Duration,
        /// Time actually spent waiting.
        elapsed: Duration,
        /// Rendering of the matcher state when the wait gave up.
        matcher: String,
        /// Leaf matchers that never matched.
        unsatisfied: Vec<String>,
        /// Number of lines fed to the matcher.
        lines_seen: usize,
    },

    /// The log stream closed before the matcher was satisfied.
    #[error(
        "logs matching {matcher} not found: stream ended after {lines_seen} lines ({elapsed:?}); unsatisfied: [{}]",
        .unsatisfied.join(", ")
    )]
    StreamEnded {
        /// Time spent before the stream closed.
        elapsed: Duration,
        /// Rendering of the matcher state when the stream closed.
        matcher: String,
        /// Leaf matchers that never matched.
        unsatisfied: Vec<String>,
        /// Number of lines fed to the matcher.
        lines_seen: usize,
    },

    /// A log line could not be decoded.
    #[error("log line {line_index}: {source}")]
    Decode {
        /// Zero-based arrival index of the offending line.
        line_index: usize,
        /// Underlying decode failure.
        source: DecodeError,
    },

    /// A regex pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Compilation error.
        source: regex::Error,
    },

    /// The multiplexed stream contained a frame that could not be decoded.
    #[error("malformed log frame: {message}")]
    MalformedFrame {
        /// What was wrong with the frame.
        message: String,
    },

    /// Reading from the underlying log source failed.
    #[error("log source I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The worker running a background wait panicked or was cancelled.
    #[error("log wait worker failed: {message}")]
    Worker {
        /// Description of the worker failure.
        message: String,
    },
}

impl LogsError {
    /// Returns whether this error means the matcher was never satisfied,
    /// either because time ran out or because the stream ended.
    #[must_use]
    pub const fn is_unsatisfied(&self) -> bool {
        matches!(self, Self::MatchTimeout { .. } | Self::StreamEnded { .. })
    }
}

/// Convenience alias for this crate.
pub type Result<T> = std::result::Result<T, LogsError>;
