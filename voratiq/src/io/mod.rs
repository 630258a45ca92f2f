//! I/O helpers for the run engine.

pub mod config;
pub mod git;
pub mod process;
pub mod records;
pub mod workspace;
