//! Stable exit codes for voratiq CLI commands.

/// Command succeeded; for `run`, every agent succeeded and no verification failed.
pub const OK: i32 = 0;
/// Command failed due to invalid workspace/config/arguments or other errors.
pub const INVALID: i32 = 1;
/// `voratiq run` completed but at least one agent or verification failed.
pub const RUN_FAILED: i32 = 1;
