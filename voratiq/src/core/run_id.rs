//! Run identifiers and record timestamps.
//!
//! Run ids look like `YYYYMMDD-HHMMSS-xxxxx` (UTC, lowercase random suffix).
//! The timestamp prefix keeps identifiers sortable by creation time; the
//! suffix makes collisions within the same second unlikely.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

const SLUG_LEN: usize = 5;

/// Generate a fresh run id from the current time.
pub fn generate_run_id() -> String {
    let mut rng = rand::thread_rng();
    let slug: String = std::iter::repeat_with(|| char::from(rng.gen_range(b'a'..=b'z')))
        .take(SLUG_LEN)
        .collect();
    format_run_id(Utc::now(), &slug)
}

pub fn format_run_id(now: DateTime<Utc>, slug: &str) -> String {
    format!("{}-{slug}", now.format("%Y%m%d-%H%M%S"))
}

/// RFC 3339 UTC timestamp with millisecond precision, e.g. `2025-10-01T14:35:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}
