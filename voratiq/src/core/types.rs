//! Persisted and derived run types.
//!
//! Field names serialize in camelCase so each line of `runs.jsonl` carries the
//! stable `runId, spec, createdAt, baseRevision, rootPath, runPath, agents`
//! shape. Optional fields are omitted when absent rather than written as
//! `null`, so a record only ever claims what the pipeline actually computed.

use serde::{Deserialize, Serialize};

/// Terminal status of one agent in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Succeeded,
    Failed,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Succeeded => "succeeded",
            AgentStatus::Failed => "failed",
        }
    }
}

/// Outcome of the verification command.
///
/// `Skipped` only appears together with an error: the command could not be
/// started at all, which is different from the verified code failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTestResult {
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentTestResult {
    /// True when the verification either ran and failed, or could not run.
    pub fn is_failure(&self) -> bool {
        self.status == TestStatus::Failed || self.error.is_some()
    }
}

/// Root-relative artifact paths for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAssets {
    pub stdout: String,
    pub stderr: String,
    pub workspace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
}

/// Durable ground truth for one agent's part in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInvocationRecord {
    pub agent_id: String,
    pub model: String,
    pub binary_path: String,
    /// Final argument vector, prompt already substituted.
    pub argv: Vec<String>,
    pub prompt: String,
    pub workspace_path: String,
    pub started_at: String,
    pub completed_at: String,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    pub assets: AgentAssets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<AgentTestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Display path and content hash of the specification a run was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecReference {
    pub path: String,
    pub sha256: String,
}

/// One line of `runs.jsonl`. Never mutated after being appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: String,
    pub spec: SpecReference,
    pub created_at: String,
    pub base_revision: String,
    pub root_path: String,
    pub run_path: String,
    pub agents: Vec<AgentInvocationRecord>,
}

/// Pipeline telemetry for one agent, derived from how far it got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentExecutionState {
    pub diff_attempted: bool,
    pub diff_captured: bool,
    pub tests_attempted: bool,
}

/// Reporting projection of an [`AgentInvocationRecord`] plus telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReport {
    pub agent_id: String,
    pub status: AgentStatus,
    pub change_summary: Option<String>,
    pub assets: AgentAssets,
    pub tests: Option<AgentTestResult>,
    pub error: Option<String>,
    pub diff_attempted: bool,
    pub diff_captured: bool,
    pub tests_attempted: bool,
}

impl AgentReport {
    /// Contribution of this agent to the run-level `had_test_failure` flag.
    pub fn had_test_failure(&self) -> bool {
        self.tests_attempted && self.tests.as_ref().is_some_and(AgentTestResult::is_failure)
    }
}

/// In-memory result of a run, handed to renderers and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub spec: SpecReference,
    pub agents: Vec<AgentReport>,
    pub had_agent_failure: bool,
    pub had_test_failure: bool,
}
