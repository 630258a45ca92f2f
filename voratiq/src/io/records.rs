//! Append-only run log (`.voratiq/runs.jsonl`).
//!
//! One JSON object per line. The appender never reads or rewrites earlier
//! lines; readers skip blank lines and report parse failures by line number.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::types::RunRecord;

/// Append `record` as a single line to `runs_file`, creating it if missing.
#[instrument(skip_all, fields(run_id = %record.run_id, runs_file = %runs_file.display()))]
pub fn append_run_record(runs_file: &Path, record: &RunRecord) -> Result<()> {
    let mut line = serde_json::to_string(record).context("serialize run record")?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(runs_file)
        .with_context(|| format!("open {}", runs_file.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("append {}", runs_file.display()))?;
    file.flush()
        .with_context(|| format!("flush {}", runs_file.display()))?;
    debug!(agents = record.agents.len(), "appended run record");
    Ok(())
}

/// Read every record in `runs_file`, oldest first. A missing file is empty.
pub fn read_run_records(runs_file: &Path) -> Result<Vec<RunRecord>> {
    if !runs_file.exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(runs_file).with_context(|| format!("read {}", runs_file.display()))?;
    let mut records = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: RunRecord = serde_json::from_str(line)
            .with_context(|| format!("parse {} line {}", runs_file.display(), index + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Look up a run by id. The latest record wins if an id was reused.
pub fn find_run<'a>(records: &'a [RunRecord], run_id: &str) -> Result<&'a RunRecord> {
    records
        .iter()
        .rev()
        .find(|record| record.run_id == run_id)
        .ok_or_else(|| anyhow!("Run not found: {run_id}"))
}
