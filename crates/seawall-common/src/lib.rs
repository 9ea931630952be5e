//! # seawall-common
//!
//! Shared error definitions, text encodings, line splitting, configuration
//! models, and constants used across the entire Seawall workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that the log matching engine
//! and the process tree reconstructor both build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod config;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod lines;
pub mod types;
