//! Configuration model for readiness waits and process listings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoding::TextEncoding;
use crate::error::{CommonError, Result};
use crate::types::StreamSelection;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeawallConfig {
    /// Settings for waiting on log output.
    pub wait: WaitConfig,
    /// Settings for reading process listings.
    pub ps: PsConfig,
}

impl SeawallConfig {
    /// Parses a configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CommonError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.wait.timeout_ms == 0 {
            return Err(CommonError::Config {
                message: "wait.timeout_ms must be greater than zero".into(),
            });
        }
        if !self.wait.streams.stdout && !self.wait.streams.stderr {
            return Err(CommonError::Config {
                message: "wait.streams must select stdout, stderr, or both".into(),
            });
        }
        Ok(())
    }
}

/// Settings for a readiness wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Overall time budget in milliseconds.
    pub timeout_ms: u64,
    /// Encoding of the log bytes.
    pub encoding: TextEncoding,
    /// Output streams to match against.
    pub streams: StreamSelection,
}

impl WaitConfig {
    /// Returns the time budget as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: crate::constants::DEFAULT_WAIT_TIMEOUT_MS,
            encoding: TextEncoding::default(),
            streams: StreamSelection::default(),
        }
    }
}

/// Settings for parsing `ps` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsConfig {
    /// Drop the row describing the `ps` invocation itself.
    pub exclude_self: bool,
    /// Encoding of the `ps` output.
    pub encoding: TextEncoding,
}

impl Default for PsConfig {
    fn default() -> Self {
        Self {
            exclude_self: true,
            encoding: TextEncoding::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SeawallConfig::default();
        assert_eq!(config.wait.timeout(), Duration::from_secs(10));
        assert_eq!(config.wait.encoding, TextEncoding::Utf8);
        assert!(config.wait.streams.stdout && config.wait.streams.stderr);
        assert!(config.ps.exclude_self);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SeawallConfig::from_json_str(r#"{"wait": {"encoding": "latin1"}}"#).unwrap();
        assert_eq!(config.wait.encoding, TextEncoding::Latin1);
        assert_eq!(config.wait.timeout_ms, 10_000);
        assert_eq!(config.ps, PsConfig::default());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = SeawallConfig::from_json_str(r#"{"wait": {"timeout_ms": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"), "got: {err}");
    }

    #[test]
    fn empty_stream_selection_is_rejected() {
        let err = SeawallConfig::from_json_str(
            r#"{"wait": {"streams": {"stdout": false, "stderr": false}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CommonError::Config { .. }));
    }

    #[test]
    fn unknown_encoding_is_a_serialization_error() {
        let err = SeawallConfig::from_json_str(r#"{"ps": {"encoding": "koi8"}}"#).unwrap_err();
        assert!(matches!(err, CommonError::Serialization { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seawall.json");
        std::fs::write(&path, r#"{"wait": {"timeout_ms": 250}}"#).expect("write");

        let config = SeawallConfig::load(&path).expect("load");
        assert_eq!(config.wait.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        let err = SeawallConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"), "got: {err}");
    }
}
