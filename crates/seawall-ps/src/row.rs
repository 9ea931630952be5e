//! Process table rows and parsing of `ps` output.

use std::fmt;

use seawall_common::config::PsConfig;
use seawall_common::constants::PS_COLUMNS;
use seawall_common::lines::output_lines;
use serde::{Deserialize, Serialize};

use crate::error::{PsError, Result};

/// One entry of a process listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PsRow {
    /// Process id.
    pub pid: u32,
    /// Parent process id.
    pub ppid: u32,
    /// Real user name.
    pub ruser: String,
    /// Full command line, embedded whitespace preserved.
    pub args: String,
}

impl PsRow {
    /// Columns requested from `ps`, in the order they appear.
    pub const COLUMNS: [&'static str; 4] = PS_COLUMNS;

    /// Creates a row from typed values.
    #[must_use]
    pub fn new(pid: u32, ppid: u32, ruser: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            ruser: ruser.into(),
            args: args.into(),
        }
    }

    /// Creates a row from the textual columns of a listing.
    ///
    /// # Errors
    ///
    /// Returns [`PsError::InvalidField`] if `pid` or `ppid` is not a
    /// non-negative integer.
    pub fn from_fields(pid: &str, ppid: &str, ruser: &str, args: &str) -> Result<Self> {
        Ok(Self::new(
            parse_pid("pid", pid)?,
            parse_pid("ppid", ppid)?,
            ruser,
            args,
        ))
    }
}

impl fmt::Display for PsRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pid, self.ruser, self.args)
    }
}

fn parse_pid(column: &'static str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| PsError::InvalidField {
        column,
        value: value.to_owned(),
    })
}

/// The command to run inside a container to list its processes.
///
/// BusyBox `ps` is the baseline, so only the `ax` and `-o` options are used.
#[must_use]
pub fn ps_command() -> Vec<String> {
    vec![
        "ps".to_owned(),
        "ax".to_owned(),
        "-o".to_owned(),
        PS_COLUMNS.join(","),
    ]
}

/// Parses the output of [`ps_command`].
///
/// The first line must be the column header. Every other non-blank line is
/// split into three whitespace-delimited columns followed by the command
/// line, which runs to the end of the line. When `exclude_self` is set the
/// row for the `ps` invocation itself is dropped.
///
/// # Errors
///
/// Returns an error if the header is missing, a row has too few columns,
/// or a pid column is not numeric.
pub fn parse_ps_output(output: &str, exclude_self: bool) -> Result<Vec<PsRow>> {
    let mut lines = output.lines().enumerate();
    let header = lines.next().map(|(_, h)| h.trim()).unwrap_or_default();
    check_header(header)?;

    let self_args = ps_command().join(" ");
    let mut rows = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let [pid, ppid, ruser, args] = split_columns(line).ok_or_else(|| PsError::MalformedRow {
            line: idx + 1,
            text: line.to_owned(),
        })?;
        if exclude_self && args == self_args {
            tracing::trace!(pid, "dropping ps row for the listing itself");
            continue;
        }
        rows.push(PsRow::from_fields(pid, ppid, ruser, args)?);
    }
    tracing::debug!(rows = rows.len(), "parsed ps output");
    Ok(rows)
}

/// Decodes raw `ps` output with the configured encoding and parses it.
///
/// # Errors
///
/// Returns [`PsError::Decode`] if the bytes cannot be decoded, or any error
/// of [`parse_ps_output`].
pub fn list_processes(raw: &[u8], config: &PsConfig) -> Result<Vec<PsRow>> {
    let text = output_lines(raw, config.encoding)?.join("\n");
    parse_ps_output(&text, config.exclude_self)
}

fn check_header(header: &str) -> Result<()> {
    let mut words = header.split_whitespace();
    let leading_ok = ["pid", "ppid", "ruser"]
        .iter()
        .all(|want| words.next().is_some_and(|w| w.eq_ignore_ascii_case(want)));
    // The last column is titled COMMAND by some implementations, ARGS by others.
    if leading_ok && words.next().is_some() {
        Ok(())
    } else {
        Err(PsError::UnexpectedHeader {
            header: header.to_owned(),
        })
    }
}

fn split_columns(line: &str) -> Option<[&str; 4]> {
    let (pid, rest) = next_token(line)?;
    let (ppid, rest) = next_token(rest)?;
    let (ruser, rest) = next_token(rest)?;
    Some([pid, ppid, ruser, rest.trim()])
}

fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}
