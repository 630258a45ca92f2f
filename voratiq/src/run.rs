//! Run coordinator: one spec, every configured agent, one appended record.

use std::fs;
use std::io;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::agents::AgentDefinition;
use crate::core::path::relative_to_root;
use crate::core::prompt::build_agent_prompt;
use crate::core::report::{ReportInvariantError, to_agent_report, to_run_report};
use crate::core::run_id::{generate_run_id, timestamp_now};
use crate::core::types::{AgentStatus, RunRecord, RunReport, SpecReference};
use crate::io::config::VoratiqConfig;
use crate::io::git::{Git, GitError};
use crate::io::process::ProcessEnv;
use crate::io::records::append_run_record;
use crate::io::workspace::VoratiqPaths;
use crate::pipeline::{PipelineContext, execute_agent};

/// Failures that stop a run as a whole. Agent failures never appear here.
#[derive(Debug, Error)]
pub enum RunCommandError {
    #[error("Test command cannot be empty or whitespace")]
    EmptyTestCommand,

    #[error("Invalid run id: {run_id:?}")]
    InvalidRunId { run_id: String },

    #[error("read spec {path}: {source}")]
    ReadSpec {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("render agent prompt: {0}")]
    Prompt(#[source] minijinja::Error),

    #[error("Run directory already exists for id {run_id}: {path}")]
    RunDirectoryExists { run_id: String, path: String },

    #[error("create run directory {path}: {source}")]
    CreateRunDirectory {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("resolve base revision: {0}")]
    BaseRevision(#[source] GitError),

    #[error("persist run record to {path}: {detail}")]
    Persist { path: String, detail: String },

    #[error(transparent)]
    Invariant(#[from] ReportInvariantError),
}

/// Inputs for [`execute_run`].
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Repository root; persisted paths are relative to it.
    pub root: PathBuf,
    pub spec_path: PathBuf,
    /// How the spec is shown in records, usually root-relative.
    pub spec_display_path: String,
    pub agents: Vec<AgentDefinition>,
    pub test_command: Option<String>,
    /// Explicit run id; generated when absent.
    pub run_id: Option<String>,
    pub config: VoratiqConfig,
    pub ambient_env: ProcessEnv,
}

/// Execute every agent against the spec and append the run record.
///
/// Runs agents one at a time in catalog order. The returned report's failure
/// flags are checked against the per-agent reports before returning.
#[instrument(skip_all, fields(root = %request.root.display()))]
pub fn execute_run(request: &RunRequest) -> Result<RunReport, RunCommandError> {
    let test_command = match request.test_command.as_deref() {
        Some(command) if command.trim().is_empty() => {
            return Err(RunCommandError::EmptyTestCommand);
        }
        other => other,
    };

    let spec_content =
        fs::read_to_string(&request.spec_path).map_err(|source| RunCommandError::ReadSpec {
            path: request.spec_display_path.clone(),
            source,
        })?;
    let spec_hash = hex::encode(Sha256::digest(spec_content.as_bytes()));
    let prompt = build_agent_prompt(&spec_content).map_err(RunCommandError::Prompt)?;

    let run_id = match &request.run_id {
        Some(run_id) => {
            validate_run_id(run_id)?;
            run_id.clone()
        }
        None => generate_run_id(),
    };

    let root = request.root.as_path();
    let paths = VoratiqPaths::new(root);
    let run_root = paths.runs_dir.join(&run_id);
    let run_display = relative_to_root(root, &run_root);
    if run_root.exists() {
        return Err(RunCommandError::RunDirectoryExists {
            run_id,
            path: run_display,
        });
    }
    let base_revision = Git::new(root)
        .head_revision()
        .map_err(RunCommandError::BaseRevision)?;

    fs::create_dir_all(&run_root).map_err(|source| RunCommandError::CreateRunDirectory {
        path: run_display.clone(),
        source,
    })?;
    let created_at = timestamp_now();
    info!(run_id = %run_id, base_revision = %base_revision, agents = request.agents.len(), "starting run");

    let ctx = PipelineContext {
        root,
        run_id: &run_id,
        run_root: &run_root,
        base_revision: &base_revision,
        prompt: &prompt,
        test_command,
        config: &request.config,
        ambient_env: &request.ambient_env,
    };

    let mut records = Vec::with_capacity(request.agents.len());
    let mut reports = Vec::with_capacity(request.agents.len());
    let mut had_agent_failure = false;
    let mut had_test_failure = false;
    for agent in &request.agents {
        let execution = execute_agent(&ctx, agent);
        had_agent_failure |= execution.record.status != AgentStatus::Succeeded;
        had_test_failure |= execution.tests_failed;
        reports.push(to_agent_report(&execution.record, execution.state));
        records.push(execution.record);
    }

    let record = RunRecord {
        run_id,
        spec: SpecReference {
            path: request.spec_display_path.clone(),
            sha256: spec_hash,
        },
        created_at,
        base_revision,
        root_path: relative_to_root(root, root),
        run_path: run_display,
        agents: records,
    };
    append_run_record(&paths.runs_file, &record).map_err(|err| RunCommandError::Persist {
        path: relative_to_root(root, &paths.runs_file),
        detail: format!("{err:#}"),
    })?;
    debug!(had_agent_failure, had_test_failure, "run recorded");

    let report = to_run_report(&record, reports, had_agent_failure, had_test_failure)?;
    info!(run_id = %report.run_id, "run complete");
    Ok(report)
}

/// Explicit run ids become a directory name and a branch segment.
fn validate_run_id(run_id: &str) -> Result<(), RunCommandError> {
    let valid = !run_id.is_empty()
        && run_id != "."
        && run_id != ".."
        && !run_id.starts_with('-')
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        return Ok(());
    }
    Err(RunCommandError::InvalidRunId {
        run_id: run_id.to_string(),
    })
}
