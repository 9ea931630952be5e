//! Errors raised while parsing process listings or building process trees.

use seawall_common::error::DecodeError;
use thiserror::Error;

/// Error type for process listing and tree reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PsError {
    /// No row has a parent outside the table, so there is nothing to root
    /// the tree at.
    #[error("no process tree root found")]
    NoRoot,

    /// More than one row could be the root.
    #[error("too many process tree roots found: {pids:?}")]
    MultipleRoots {
        /// Pids of every root candidate, in input order.
        pids: Vec<u32>,
    },

    /// Two rows share a pid.
    #[error("duplicate pid found: {pid}")]
    DuplicatePid {
        /// The repeated pid.
        pid: u32,
    },

    /// Some rows cannot be reached from the root.
    #[error("unreachable processes found: {pids:?}")]
    Unreachable {
        /// Pids of the unreachable rows, in input order.
        pids: Vec<u32>,
    },

    /// A pid column did not hold a non-negative integer.
    #[error("invalid {column} value: {value:?}")]
    InvalidField {
        /// Column name.
        column: &'static str,
        /// Text found in the column.
        value: String,
    },

    /// The listing did not start with the expected header.
    #[error("unexpected ps header: {header:?}")]
    UnexpectedHeader {
        /// The header line as found (empty if the output was empty).
        header: String,
    },

    /// A row had fewer columns than requested.
    #[error("ps output line {line} has too few columns: {text:?}")]
    MalformedRow {
        /// One-based line number in the listing, header included.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// The listing could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Convenience alias for this crate.
pub type Result<T> = std::result::Result<T, PsError>;
