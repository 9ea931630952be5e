//! System-wide constants and defaults.

/// Default time budget for a readiness wait, in milliseconds.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Columns requested from `ps`, in output order.
pub const PS_COLUMNS: [&str; 4] = ["pid", "ppid", "ruser", "args"];

/// Parent pid reported for a container's init process.
pub const ROOT_PARENT_PID: u32 = 0;

/// Length of a multiplexed attach-stream frame header.
pub const FRAME_HEADER_LEN: usize = 8;

/// Size of each read when pulling output from a blocking reader.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "seawall";
