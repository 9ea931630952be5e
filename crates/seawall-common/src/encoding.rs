//! Text encodings used to decode container output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, DecodeError};

/// Encoding applied to raw container output before it is matched or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextEncoding {
    /// UTF-8, the default for container logs.
    #[default]
    Utf8,
    /// ISO-8859-1. Every byte maps to the code point of the same value.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

impl TextEncoding {
    /// Canonical name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Ascii => "ascii",
        }
    }

    /// Decodes `bytes` into an owned string.
    ///
    /// Never replaces or drops bytes: input that is not valid in this
    /// encoding is rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] naming the first invalid byte.
    pub fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Self::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(s.to_owned()),
                Err(e) => Err(self.error_at(bytes, e.valid_up_to())),
            },
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                // All-ASCII input is valid UTF-8 as well.
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
                Some(offset) => Err(self.error_at(bytes, offset)),
            },
        }
    }

    fn error_at(self, bytes: &[u8], offset: usize) -> DecodeError {
        DecodeError {
            encoding: self,
            offset,
            byte: bytes.get(offset).copied().unwrap_or_default(),
            len: bytes.len(),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            other => Err(CommonError::Config {
                message: format!("unsupported text encoding: {other}"),
            }),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TextEncoding> for String {
    fn from(value: TextEncoding) -> Self {
        value.name().to_owned()
    }
}
