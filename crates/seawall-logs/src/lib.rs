//! # seawall-logs
//!
//! Decides whether a service has reached an expected state by matching its
//! log output as it arrives.
//!
//! - [`matcher`]: stateful line matchers (equality, regex, ordered and
//!   unordered sequences, alternatives).
//! - [`source`]: log sources the wait driver pulls raw chunks from.
//! - [`frame`]: decoder for the multiplexed attach stream of a container.
//! - [`wait`]: the deadline-bounded readiness wait.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use seawall_common::encoding::TextEncoding;
//! use seawall_logs::matcher::UnorderedLinesMatcher;
//! use seawall_logs::source::ChunkSource;
//! use seawall_logs::wait::wait_for_logs_matching;
//!
//! let source = ChunkSource::new([b"db ready\nhttp ready\n".to_vec()]);
//! let mut matcher = UnorderedLinesMatcher::by_regex(["^http", "^db"])?;
//! let line = wait_for_logs_matching(
//!     source,
//!     &mut matcher,
//!     Duration::from_secs(1),
//!     TextEncoding::Utf8,
//! )?;
//! assert_eq!(line, "http ready");
//! # Ok::<(), seawall_logs::error::LogsError>(())
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod error;
pub mod frame;
pub mod matcher;
pub mod source;
pub mod wait;
