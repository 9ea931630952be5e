//! Unified error types for the Seawall workspace.
//!
//! Each higher-level crate defines its own domain-specific error enum that
//! wraps these common variants when appropriate.

use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::TextEncoding;

/// Raw bytes could not be decoded with the configured text encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {len} bytes as {encoding}: invalid byte 0x{byte:02x} at offset {offset}")]
pub struct DecodeError {
    /// Encoding that was used.
    pub encoding: TextEncoding,
    /// Offset of the first byte that could not be decoded.
    pub offset: usize,
    /// Value of the offending byte.
    pub byte: u8,
    /// Total length of the input that failed to decode.
    pub len: usize,
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CommonError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_offset_and_byte() {
        let err = DecodeError {
            encoding: TextEncoding::Utf8,
            offset: 3,
            byte: 0xfe,
            len: 8,
        };
        assert_eq!(
            err.to_string(),
            "cannot decode 8 bytes as utf-8: invalid byte 0xfe at offset 3"
        );
    }

    #[test]
    fn config_error_carries_message() {
        let err = CommonError::Config {
            message: "wait.timeout_ms must be greater than zero".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: wait.timeout_ms must be greater than zero"
        );
    }
}
