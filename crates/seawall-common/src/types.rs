//! Domain primitive types used across the Seawall workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Standard stream a chunk of container output was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Standard input, echoed back by attached TTY-less containers.
    Stdin,
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl StreamKind {
    /// Maps the stream-type byte of a multiplexed frame header.
    #[must_use]
    pub const fn from_frame_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Stdin),
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Which output streams a log wait should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSelection {
    /// Include standard output.
    pub stdout: bool,
    /// Include standard error.
    pub stderr: bool,
}

impl StreamSelection {
    /// Returns whether output written to `kind` is selected.
    #[must_use]
    pub const fn includes(self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Stdout => self.stdout,
            StreamKind::Stderr => self.stderr,
            StreamKind::Stdin => false,
        }
    }
}

impl Default for StreamSelection {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
        }
    }
}
