//! Orchestration for a single agent within a run.
//!
//! The pipeline walks one agent through scaffold, checkout, invoke, harvest,
//! capture and verify. Each stage either advances a typed [`Progress`] value
//! or stops with a [`RunError`]; the resulting [`PipelineOutcome`] is folded
//! into exactly one [`AgentInvocationRecord`]. Telemetry (`diff_attempted`,
//! `diff_captured`, `tests_attempted`) is read off the outcome rather than
//! tracked as mutable flags.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::agents::AgentDefinition;
use crate::core::argv::substitute_prompt;
use crate::core::errors::{ProcessPhase, RunError, SummaryProblem, WORKSPACE_SUMMARY_FILENAME};
use crate::core::path::relative_to_root;
use crate::core::run_id::timestamp_now;
use crate::core::types::{
    AgentAssets, AgentExecutionState, AgentInvocationRecord, AgentStatus, AgentTestResult,
    TestStatus,
};
use crate::io::config::VoratiqConfig;
use crate::io::git::Git;
use crate::io::process::{
    ProcessEnv, ProcessError, agent_command, describe_exit, exit_signal,
    missing_command_program, run_to_files, run_to_log, shell_command,
};

const STDOUT_FILENAME: &str = "stdout.log";
const STDERR_FILENAME: &str = "stderr.log";
const DIFF_FILENAME: &str = "diff.patch";
const SUMMARY_FILENAME: &str = "summary.txt";
const TESTS_FILENAME: &str = "tests.log";
const WORKSPACE_DIRNAME: &str = "workspace";

/// Filesystem locations for one agent, derived from `(run root, agent id)`.
#[derive(Debug, Clone)]
pub struct AgentWorkspacePaths {
    pub agent_root: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub diff: PathBuf,
    pub summary: PathBuf,
    pub tests_log: PathBuf,
    pub workspace: PathBuf,
}

impl AgentWorkspacePaths {
    pub fn new(run_root: &Path, agent_id: &str) -> Self {
        let agent_root = run_root.join(agent_id);
        Self {
            stdout: agent_root.join(STDOUT_FILENAME),
            stderr: agent_root.join(STDERR_FILENAME),
            diff: agent_root.join(DIFF_FILENAME),
            summary: agent_root.join(SUMMARY_FILENAME),
            tests_log: agent_root.join(TESTS_FILENAME),
            workspace: agent_root.join(WORKSPACE_DIRNAME),
            agent_root,
        }
    }
}

/// Run-wide inputs shared by every agent's pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    pub root: &'a Path,
    pub run_id: &'a str,
    pub run_root: &'a Path,
    pub base_revision: &'a str,
    /// Rendered agent prompt, identical for every agent in the run.
    pub prompt: &'a str,
    pub test_command: Option<&'a str>,
    pub config: &'a VoratiqConfig,
    /// Environment snapshot taken once per run; agent variables are layered on top.
    pub ambient_env: &'a ProcessEnv,
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Scaffold,
    Checkout,
    Invoke,
    Harvest,
    Capture,
    Verify,
}

/// Commit produced from the agent's edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub commit: String,
    pub change_summary: Option<String>,
}

/// How far an agent got, carrying whatever each stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Started,
    CheckedOut,
    Invoked,
    Harvested {
        summary: String,
    },
    Captured {
        summary: String,
        change: Option<ChangeSet>,
    },
    Verified {
        summary: String,
        change: Option<ChangeSet>,
        tests: AgentTestResult,
    },
}

impl Progress {
    fn summary(&self) -> Option<&str> {
        match self {
            Progress::Harvested { summary }
            | Progress::Captured { summary, .. }
            | Progress::Verified { summary, .. } => Some(summary),
            Progress::Started | Progress::CheckedOut | Progress::Invoked => None,
        }
    }

    fn change(&self) -> Option<&ChangeSet> {
        match self {
            Progress::Captured { change, .. } | Progress::Verified { change, .. } => {
                change.as_ref()
            }
            _ => None,
        }
    }

    fn tests(&self) -> Option<&AgentTestResult> {
        match self {
            Progress::Verified { tests, .. } => Some(tests),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed(Progress),
    Failed {
        progress: Progress,
        stage: Stage,
        error: RunError,
    },
}

impl PipelineOutcome {
    fn failed(progress: Progress, stage: Stage, error: RunError) -> Self {
        PipelineOutcome::Failed {
            progress,
            stage,
            error,
        }
    }

    pub fn progress(&self) -> &Progress {
        match self {
            PipelineOutcome::Completed(progress) | PipelineOutcome::Failed { progress, .. } => {
                progress
            }
        }
    }

    pub fn status(&self) -> AgentStatus {
        match self {
            PipelineOutcome::Completed(_) => AgentStatus::Succeeded,
            PipelineOutcome::Failed { .. } => AgentStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&RunError> {
        match self {
            PipelineOutcome::Completed(_) => None,
            PipelineOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn execution_state(&self) -> AgentExecutionState {
        let progress = self.progress();
        let diff_attempted = match self {
            PipelineOutcome::Failed { stage, .. } => *stage >= Stage::Capture,
            PipelineOutcome::Completed(progress) => matches!(
                progress,
                Progress::Captured { .. } | Progress::Verified { .. }
            ),
        };
        AgentExecutionState {
            diff_attempted,
            diff_captured: progress.change().is_some(),
            tests_attempted: progress.tests().is_some(),
        }
    }

    /// Whether verification ran and did not pass. Feeds the run-level flag.
    pub fn tests_failed(&self) -> bool {
        self.progress()
            .tests()
            .is_some_and(|tests| tests.status != TestStatus::Passed)
    }
}

/// Everything the coordinator needs from one agent.
#[derive(Debug, Clone)]
pub struct AgentExecution {
    pub record: AgentInvocationRecord,
    pub state: AgentExecutionState,
    pub tests_failed: bool,
}

/// Run one agent end to end. Stage failures are folded into the record.
#[instrument(skip_all, fields(agent = %agent.id, run_id = %ctx.run_id))]
pub fn execute_agent(ctx: &PipelineContext<'_>, agent: &AgentDefinition) -> AgentExecution {
    let paths = AgentWorkspacePaths::new(ctx.run_root, &agent.id);
    let prompt = ctx.prompt.to_string();
    let argv = substitute_prompt(&agent.argv, &prompt);
    let env = agent_env(ctx.ambient_env, agent, ctx.run_id);

    let started_at = timestamp_now();
    let outcome = drive(ctx, agent, &paths, &prompt, &argv, &env);
    let completed_at = timestamp_now();

    match &outcome {
        PipelineOutcome::Completed(_) => info!("agent succeeded"),
        PipelineOutcome::Failed { stage, error, .. } => warn!(
            ?stage,
            kind = error.kind().as_str(),
            detail = error.detail().unwrap_or_default(),
            "agent failed"
        ),
    }

    let state = outcome.execution_state();
    let tests_failed = outcome.tests_failed();
    let record = build_record(
        ctx.root,
        agent,
        &paths,
        RecordParts {
            argv,
            prompt,
            started_at,
            completed_at,
        },
        &outcome,
    );
    AgentExecution {
        record,
        state,
        tests_failed,
    }
}

/// Child environment: ambient snapshot plus the agent's identity.
pub fn agent_env(ambient: &ProcessEnv, agent: &AgentDefinition, run_id: &str) -> ProcessEnv {
    let mut env = ambient.clone();
    env.insert("VORATIQ_AGENT_ID".to_string(), agent.id.clone());
    env.insert("VORATIQ_AGENT_MODEL".to_string(), agent.model.clone());
    env.insert("VORATIQ_RUN_ID".to_string(), run_id.to_string());
    env
}

pub fn branch_name(namespace: &str, run_id: &str, agent_id: &str) -> String {
    format!("{namespace}/run/{run_id}/{agent_id}")
}

fn drive(
    ctx: &PipelineContext<'_>,
    agent: &AgentDefinition,
    paths: &AgentWorkspacePaths,
    prompt: &str,
    argv: &[String],
    env: &ProcessEnv,
) -> PipelineOutcome {
    if let Err(error) = scaffold(ctx.root, paths) {
        return PipelineOutcome::failed(Progress::Started, Stage::Scaffold, error);
    }
    if let Err(error) = checkout(ctx, agent, paths) {
        return PipelineOutcome::failed(Progress::Started, Stage::Checkout, error);
    }
    if let Err(error) = invoke(agent, paths, prompt, argv, env) {
        return PipelineOutcome::failed(Progress::CheckedOut, Stage::Invoke, error);
    }
    let summary = match harvest(ctx.root, paths) {
        Ok(summary) => summary,
        Err(error) => return PipelineOutcome::failed(Progress::Invoked, Stage::Harvest, error),
    };
    let change = match capture(ctx, paths, &summary) {
        Ok(change) => change,
        Err(error) => {
            return PipelineOutcome::failed(
                Progress::Harvested { summary },
                Stage::Capture,
                error,
            );
        }
    };
    let Some(command) = ctx.test_command else {
        return PipelineOutcome::Completed(Progress::Captured { summary, change });
    };
    let tests = verify(ctx, paths, command, env);
    PipelineOutcome::Completed(Progress::Verified {
        summary,
        change,
        tests,
    })
}

#[instrument(skip_all)]
fn scaffold(root: &Path, paths: &AgentWorkspacePaths) -> Result<(), RunError> {
    let setup_failed = |path: &Path, err: io::Error| {
        RunError::workspace_setup(format!(
            "Failed to prepare {}: {err}",
            relative_to_root(root, path)
        ))
    };

    fs::create_dir_all(&paths.agent_root).map_err(|err| setup_failed(&paths.agent_root, err))?;
    for file in [&paths.stdout, &paths.stderr, &paths.diff, &paths.tests_log] {
        File::create(file).map_err(|err| setup_failed(file, err))?;
    }
    fs::create_dir_all(&paths.workspace).map_err(|err| setup_failed(&paths.workspace, err))?;
    debug!(agent_root = %paths.agent_root.display(), "scaffolded agent directory");
    Ok(())
}

#[instrument(skip_all)]
fn checkout(
    ctx: &PipelineContext<'_>,
    agent: &AgentDefinition,
    paths: &AgentWorkspacePaths,
) -> Result<(), RunError> {
    let branch = branch_name(&ctx.config.branch_namespace, ctx.run_id, &agent.id);
    Git::new(ctx.root)
        .create_worktree(&paths.workspace, &branch, ctx.base_revision)
        .map_err(|err| {
            RunError::workspace_setup(format!(
                "Failed to create worktree {}: {err}",
                relative_to_root(ctx.root, &paths.workspace)
            ))
        })
}

#[instrument(skip_all, fields(binary = %agent.binary_path.display()))]
fn invoke(
    agent: &AgentDefinition,
    paths: &AgentWorkspacePaths,
    prompt: &str,
    argv: &[String],
    env: &ProcessEnv,
) -> Result<(), RunError> {
    let open_log = |path: &Path| {
        File::create(path).map_err(|err| {
            RunError::workspace_setup(format!("Failed to open {}: {err}", path.display()))
        })
    };
    let stdout = open_log(&paths.stdout)?;
    let stderr = open_log(&paths.stderr)?;

    let cmd = agent_command(&agent.binary_path, argv, &paths.workspace, env);
    let status = match run_to_files(cmd, Some(prompt.as_bytes()), stdout, stderr) {
        Ok(status) => status,
        Err(err @ ProcessError::Spawn { .. }) => {
            return Err(RunError::AgentProcess {
                phase: ProcessPhase::BeforeOutput,
                exit_code: None,
                detail: Some(err.to_string()),
            });
        }
        Err(err) => {
            return Err(RunError::AgentProcess {
                phase: classify_phase(&paths.workspace),
                exit_code: None,
                detail: Some(err.to_string()),
            });
        }
    };

    if status.success() {
        debug!("agent exited cleanly");
        return Ok(());
    }
    debug!(exit_code = ?status.code(), signal = ?exit_signal(&status), "agent exited with failure");
    Err(RunError::AgentProcess {
        phase: classify_phase(&paths.workspace),
        exit_code: status.code(),
        detail: Some(describe_exit(&status)),
    })
}

/// Decide whether a failed agent had already touched its workspace.
fn classify_phase(workspace: &Path) -> ProcessPhase {
    match Git::new(workspace).has_uncommitted_changes() {
        Ok(true) => ProcessPhase::AfterOutput,
        Ok(false) => ProcessPhase::BeforeOutput,
        Err(err) => {
            warn!(err = %err, "could not inspect workspace after agent failure");
            ProcessPhase::AfterOutput
        }
    }
}

/// Read, validate and persist `.summary.txt`, removing the workspace copy.
///
/// Indentation on the first line is dropped, but leading newlines are kept so
/// a blank first line is still visible to the commit-subject check.
#[instrument(skip_all)]
fn harvest(root: &Path, paths: &AgentWorkspacePaths) -> Result<String, RunError> {
    let workspace_summary = paths.workspace.join(WORKSPACE_SUMMARY_FILENAME);
    let raw = match fs::read_to_string(&workspace_summary) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(RunError::summary(SummaryProblem::Missing));
        }
        Err(err) => {
            return Err(RunError::summary(SummaryProblem::Unreadable(
                err.to_string(),
            )));
        }
    };
    if raw.trim().is_empty() {
        return Err(RunError::summary(SummaryProblem::Empty));
    }

    let summary = raw.trim_end().trim_start_matches([' ', '\t']).to_string();
    fs::write(&paths.summary, format!("{summary}\n")).map_err(|err| {
        RunError::workspace_setup(format!(
            "Failed to write {}: {err}",
            relative_to_root(root, &paths.summary)
        ))
    })?;
    fs::remove_file(&workspace_summary).map_err(|err| {
        RunError::workspace_setup(format!(
            "Failed to remove {}: {err}",
            relative_to_root(root, &workspace_summary)
        ))
    })?;
    debug!(bytes = summary.len(), "harvested summary");
    Ok(summary)
}

#[instrument(skip_all)]
fn capture(
    ctx: &PipelineContext<'_>,
    paths: &AgentWorkspacePaths,
    summary: &str,
) -> Result<Option<ChangeSet>, RunError> {
    let git = Git::new(&paths.workspace);
    git.add_all()
        .map_err(|err| RunError::git("Git add failed", err))?;
    let staged = git
        .has_staged_changes()
        .map_err(|err| RunError::git("Git status failed", err))?;
    if !staged {
        debug!("agent left no changes to commit");
        return Ok(None);
    }

    let subject = summary.lines().next().unwrap_or_default().trim();
    if subject.is_empty() {
        return Err(RunError::summary(SummaryProblem::MissingSubject));
    }

    let commit = git
        .commit_all(subject, &ctx.config.commit_author)
        .map_err(|err| RunError::git("Git commit failed", err))?;
    let diff = git
        .diff(ctx.base_revision, &commit)
        .map_err(|err| RunError::git("Git diff failed", err))?;
    fs::write(&paths.diff, diff).map_err(|err| {
        RunError::git(
            format!(
                "Failed to write {}",
                relative_to_root(ctx.root, &paths.diff)
            ),
            err,
        )
    })?;
    let change_summary = git
        .diff_shortstat(ctx.base_revision, &commit)
        .map_err(|err| RunError::git("Git diff --shortstat failed", err))?;

    info!(commit = %commit, "captured agent changes");
    Ok(Some(ChangeSet {
        commit,
        change_summary,
    }))
}

/// Run the verification command. Never fails the agent.
#[instrument(skip_all, fields(command = %command))]
fn verify(
    ctx: &PipelineContext<'_>,
    paths: &AgentWorkspacePaths,
    command: &str,
    env: &ProcessEnv,
) -> AgentTestResult {
    let not_started = |detail: String| {
        let error = RunError::TestCommand { detail };
        warn!(err = %error, "verification did not start");
        AgentTestResult {
            status: TestStatus::Skipped,
            command: Some(command.to_string()),
            exit_code: None,
            log_path: None,
            error: Some(error.to_string()),
        }
    };

    if let Some(detail) = missing_command_program(command, &paths.workspace, env) {
        return not_started(detail);
    }
    let log = match File::create(&paths.tests_log) {
        Ok(log) => log,
        Err(err) => return not_started(err.to_string()),
    };
    let cmd = shell_command(&ctx.config.shell, command, &paths.workspace, env);
    let status = match run_to_log(cmd, log) {
        Ok(status) => status,
        Err(err) => return not_started(err.to_string()),
    };

    let passed = status.success();
    debug!(passed, exit_code = ?status.code(), "verification finished");
    AgentTestResult {
        status: if passed {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        },
        command: Some(command.to_string()),
        exit_code: status.code(),
        log_path: Some(relative_to_root(ctx.root, &paths.tests_log)),
        error: None,
    }
}

struct RecordParts {
    argv: Vec<String>,
    prompt: String,
    started_at: String,
    completed_at: String,
}

fn build_record(
    root: &Path,
    agent: &AgentDefinition,
    paths: &AgentWorkspacePaths,
    parts: RecordParts,
    outcome: &PipelineOutcome,
) -> AgentInvocationRecord {
    let progress = outcome.progress();
    let change = progress.change();
    let summary = progress.summary().map(str::to_string);
    let tests = progress.tests().cloned();
    let display = |path: &Path| relative_to_root(root, path);

    AgentInvocationRecord {
        agent_id: agent.id.clone(),
        model: agent.model.clone(),
        binary_path: agent.binary_path.display().to_string(),
        argv: parts.argv,
        prompt: parts.prompt,
        workspace_path: display(&paths.workspace),
        started_at: parts.started_at,
        completed_at: parts.completed_at,
        status: outcome.status(),
        commit: change.map(|change| change.commit.clone()),
        change_summary: change.and_then(|change| change.change_summary.clone()),
        assets: AgentAssets {
            stdout: display(&paths.stdout),
            stderr: display(&paths.stderr),
            workspace: display(&paths.workspace),
            diff: change.map(|_| display(&paths.diff)),
            summary: summary.as_ref().map(|_| display(&paths.summary)),
            tests: tests.as_ref().and_then(|tests| tests.log_path.clone()),
        },
        summary,
        tests,
        error: outcome.error().map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> Option<ChangeSet> {
        Some(ChangeSet {
            commit: "abc".to_string(),
            change_summary: Some("1 file changed".to_string()),
        })
    }

    fn tests_result(status: TestStatus) -> AgentTestResult {
        AgentTestResult {
            status,
            command: Some("make test".to_string()),
            exit_code: Some(if status == TestStatus::Passed { 0 } else { 1 }),
            log_path: Some(".voratiq/runs/r/codex/tests.log".to_string()),
            error: None,
        }
    }

    fn agent() -> AgentDefinition {
        AgentDefinition {
            id: "codex".to_string(),
            model: "gpt-5".to_string(),
            binary_path: PathBuf::from("/bin/codex"),
            argv: vec!["exec".to_string()],
        }
    }

    #[test]
    fn paths_are_derived_from_run_root_and_agent() {
        let paths = AgentWorkspacePaths::new(Path::new("/repo/.voratiq/runs/r1"), "codex");
        assert_eq!(paths.agent_root, Path::new("/repo/.voratiq/runs/r1/codex"));
        assert!(paths.stdout.ends_with("codex/stdout.log"));
        assert!(paths.diff.ends_with("codex/diff.patch"));
        assert!(paths.summary.ends_with("codex/summary.txt"));
        assert!(paths.tests_log.ends_with("codex/tests.log"));
        assert!(paths.workspace.ends_with("codex/workspace"));
    }

    #[test]
    fn branch_name_is_namespaced_per_run_and_agent() {
        assert_eq!(
            branch_name("voratiq", "20251001-143500-abcde", "claude-code"),
            "voratiq/run/20251001-143500-abcde/claude-code"
        );
    }

    #[test]
    fn agent_env_layers_identity_over_snapshot() {
        let mut ambient = ProcessEnv::new();
        ambient.insert("PATH".to_string(), "/bin".to_string());
        ambient.insert("VORATIQ_AGENT_ID".to_string(), "stale".to_string());

        let env = agent_env(&ambient, &agent(), "run-1");
        assert_eq!(env["PATH"], "/bin");
        assert_eq!(env["VORATIQ_AGENT_ID"], "codex");
        assert_eq!(env["VORATIQ_AGENT_MODEL"], "gpt-5");
        assert_eq!(env["VORATIQ_RUN_ID"], "run-1");
        assert_eq!(ambient["VORATIQ_AGENT_ID"], "stale");
    }

    #[test]
    fn failure_before_capture_attempts_nothing() {
        let outcome = PipelineOutcome::failed(
            Progress::Invoked,
            Stage::Harvest,
            RunError::summary(SummaryProblem::Missing),
        );
        assert_eq!(outcome.execution_state(), AgentExecutionState::default());
        assert_eq!(outcome.status(), AgentStatus::Failed);
        assert!(!outcome.tests_failed());
    }

    #[test]
    fn failure_during_capture_counts_as_attempted() {
        let outcome = PipelineOutcome::failed(
            Progress::Harvested {
                summary: "\nbody".to_string(),
            },
            Stage::Capture,
            RunError::summary(SummaryProblem::MissingSubject),
        );
        let state = outcome.execution_state();
        assert!(state.diff_attempted);
        assert!(!state.diff_captured);
        assert!(!state.tests_attempted);
    }

    #[test]
    fn completed_without_changes_attempted_but_not_captured() {
        let outcome = PipelineOutcome::Completed(Progress::Captured {
            summary: "No-op".to_string(),
            change: None,
        });
        let state = outcome.execution_state();
        assert!(state.diff_attempted);
        assert!(!state.diff_captured);
        assert_eq!(outcome.status(), AgentStatus::Succeeded);
    }

    #[test]
    fn verified_outcome_reports_tests() {
        let passed = PipelineOutcome::Completed(Progress::Verified {
            summary: "Add".to_string(),
            change: change(),
            tests: tests_result(TestStatus::Passed),
        });
        assert!(passed.execution_state().tests_attempted);
        assert!(passed.execution_state().diff_captured);
        assert!(!passed.tests_failed());

        let failed = PipelineOutcome::Completed(Progress::Verified {
            summary: "Add".to_string(),
            change: change(),
            tests: tests_result(TestStatus::Failed),
        });
        assert!(failed.tests_failed());
    }

    #[test]
    fn record_only_claims_computed_fields() {
        let root = Path::new("/repo");
        let paths = AgentWorkspacePaths::new(&root.join(".voratiq/runs/r1"), "codex");
        let outcome = PipelineOutcome::failed(
            Progress::Harvested {
                summary: "\nbody".to_string(),
            },
            Stage::Capture,
            RunError::summary(SummaryProblem::MissingSubject),
        );

        let record = build_record(
            root,
            &agent(),
            &paths,
            RecordParts {
                argv: vec!["exec".to_string(), "prompt".to_string()],
                prompt: "prompt".to_string(),
                started_at: "2025-10-01T14:35:00.000Z".to_string(),
                completed_at: "2025-10-01T14:35:01.000Z".to_string(),
            },
            &outcome,
        );

        assert_eq!(record.status, AgentStatus::Failed);
        assert_eq!(record.summary.as_deref(), Some("\nbody"));
        assert_eq!(record.commit, None);
        assert_eq!(record.assets.diff, None);
        assert_eq!(
            record.assets.summary.as_deref(),
            Some(".voratiq/runs/r1/codex/summary.txt")
        );
        assert_eq!(record.workspace_path, ".voratiq/runs/r1/codex/workspace");
        assert_eq!(
            record.error.as_deref(),
            Some("Agent summary is missing a subject line")
        );
    }
}
