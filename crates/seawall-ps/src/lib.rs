//! # seawall-ps
//!
//! Reconstructs and checks the process topology running inside a
//! container.
//!
//! - [`row`]: the [`PsRow`](row::PsRow) record and `ps` output parsing.
//! - [`tree`]: [`build_process_tree`](tree::build_process_tree) and the
//!   [`ProcessTree`](tree::ProcessTree) it produces.
//! - [`expect`]: order-insensitive expectations over a process tree.
//!
//! # Example
//!
//! ```rust
//! use seawall_ps::row::PsRow;
//! use seawall_ps::tree::build_process_tree;
//!
//! let rows = vec![
//!     PsRow::new(1, 0, "root", "tini -- nginx -g 'daemon off;'"),
//!     PsRow::new(6, 1, "root", "nginx: master process"),
//!     PsRow::new(8, 6, "nginx", "nginx: worker process"),
//! ];
//! let tree = build_process_tree(&rows)?;
//! assert_eq!(tree.count(), 3);
//! # Ok::<(), seawall_ps::error::PsError>(())
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod error;
pub mod expect;
pub mod row;
pub mod tree;
