//! Multi-agent run execution engine.
//!
//! Every configured agent gets its own git worktree, is invoked once with the
//! same spec-derived prompt, and leaves behind a summary, a commit and a diff
//! (plus an optional verification result). Each run is appended to
//! `.voratiq/runs.jsonl` as one immutable record.
//!
//! - **[`core`]**: Pure, deterministic logic (types, error taxonomy, argv and
//!   prompt construction, report derivation). No I/O.
//! - **[`io`]**: Side-effecting operations (git, process execution, run log,
//!   config, workspace scaffold).
//! - **[`agents`]**: Agent definitions loaded from the environment.
//!
//! Orchestration modules ([`pipeline`], [`run`], [`cli`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod agents;
pub mod cli;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
