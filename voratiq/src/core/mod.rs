//! Deterministic, pure logic shared by the run engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.
//! `run_id` is the one exception: it reads the clock and a random source.

pub mod argv;
pub mod errors;
pub mod path;
pub mod prompt;
pub mod report;
pub mod run_id;
pub mod types;
