//! Closed failure taxonomy for the agent pipeline.
//!
//! Every stage failure is converted into exactly one [`RunError`] variant at
//! the pipeline boundary. The `Display` impl is the canonical, user-facing
//! message that ends up in the agent's record; any extra detail that is useful
//! for debugging but not for the user is kept in fields and logged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the summary file every agent must leave at its workspace root.
pub const WORKSPACE_SUMMARY_FILENAME: &str = ".summary.txt";

/// Stable identifier for each failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunErrorKind {
    WorkspaceSetup,
    AgentProcess,
    SummaryMissing,
    GitOperation,
    TestCommand,
}

impl RunErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RunErrorKind::WorkspaceSetup => "workspace-setup",
            RunErrorKind::AgentProcess => "agent-process",
            RunErrorKind::SummaryMissing => "summary-missing",
            RunErrorKind::GitOperation => "git-operation",
            RunErrorKind::TestCommand => "test-command",
        }
    }
}

/// Whether the agent process had already touched the workspace when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessPhase {
    BeforeOutput,
    AfterOutput,
}

/// What exactly was wrong with the agent's summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryProblem {
    Missing,
    Unreadable(String),
    Empty,
    MissingSubject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("{detail}")]
    WorkspaceSetup { detail: String },

    #[error("{}", agent_process_message(.phase, .exit_code))]
    AgentProcess {
        phase: ProcessPhase,
        exit_code: Option<i32>,
        detail: Option<String>,
    },

    #[error("{}", summary_message(.problem))]
    SummaryMissing { problem: SummaryProblem },

    #[error("{operation}: {detail}")]
    GitOperation { operation: String, detail: String },

    #[error("Tests command failed to start: {detail}")]
    TestCommand { detail: String },
}

impl RunError {
    pub fn workspace_setup(detail: impl Into<String>) -> Self {
        RunError::WorkspaceSetup {
            detail: detail.into(),
        }
    }

    pub fn git(operation: impl Into<String>, detail: impl ToString) -> Self {
        RunError::GitOperation {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }

    pub fn summary(problem: SummaryProblem) -> Self {
        RunError::SummaryMissing { problem }
    }

    pub fn kind(&self) -> RunErrorKind {
        match self {
            RunError::WorkspaceSetup { .. } => RunErrorKind::WorkspaceSetup,
            RunError::AgentProcess { .. } => RunErrorKind::AgentProcess,
            RunError::SummaryMissing { .. } => RunErrorKind::SummaryMissing,
            RunError::GitOperation { .. } => RunErrorKind::GitOperation,
            RunError::TestCommand { .. } => RunErrorKind::TestCommand,
        }
    }

    /// Diagnostic detail beyond the display message, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            RunError::AgentProcess { detail, .. } => detail.as_deref(),
            RunError::SummaryMissing {
                problem: SummaryProblem::Unreadable(detail),
            } => Some(detail),
            RunError::WorkspaceSetup { detail }
            | RunError::GitOperation { detail, .. }
            | RunError::TestCommand { detail } => Some(detail),
            RunError::SummaryMissing { .. } => None,
        }
    }
}

fn agent_process_message(phase: &ProcessPhase, exit_code: &Option<i32>) -> String {
    match phase {
        ProcessPhase::BeforeOutput => "Agent exited before modifying the workspace".to_string(),
        ProcessPhase::AfterOutput => match exit_code {
            Some(code) => {
                format!("Agent process failed after editing the workspace (exit code {code})")
            }
            None => "Agent process failed after editing the workspace".to_string(),
        },
    }
}

fn summary_message(problem: &SummaryProblem) -> String {
    match problem {
        SummaryProblem::Missing | SummaryProblem::Unreadable(_) => {
            format!("Agent did not produce {WORKSPACE_SUMMARY_FILENAME}")
        }
        SummaryProblem::Empty => "Agent summary is empty".to_string(),
        SummaryProblem::MissingSubject => "Agent summary is missing a subject line".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_setup_displays_detail() {
        let err = RunError::workspace_setup("Failed to create directory");
        assert_eq!(err.to_string(), "Failed to create directory");
        assert_eq!(err.kind(), RunErrorKind::WorkspaceSetup);
    }

    #[test]
    fn agent_process_before_output_ignores_exit_code() {
        let err = RunError::AgentProcess {
            phase: ProcessPhase::BeforeOutput,
            exit_code: Some(2),
            detail: Some("terminated by signal 9".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Agent exited before modifying the workspace"
        );
        assert_eq!(err.detail(), Some("terminated by signal 9"));
    }

    #[test]
    fn agent_process_after_output_includes_exit_code() {
        let err = RunError::AgentProcess {
            phase: ProcessPhase::AfterOutput,
            exit_code: Some(9),
            detail: None,
        };
        assert_eq!(
            err.to_string(),
            "Agent process failed after editing the workspace (exit code 9)"
        );
    }

    #[test]
    fn summary_problems_have_distinct_messages() {
        assert_eq!(
            RunError::summary(SummaryProblem::Missing).to_string(),
            "Agent did not produce .summary.txt"
        );
        assert_eq!(
            RunError::summary(SummaryProblem::Empty).to_string(),
            "Agent summary is empty"
        );
        assert_eq!(
            RunError::summary(SummaryProblem::MissingSubject).to_string(),
            "Agent summary is missing a subject line"
        );
    }

    #[test]
    fn git_operation_joins_operation_and_detail() {
        let err = RunError::git("Git commit failed", "exit status 1");
        assert_eq!(err.to_string(), "Git commit failed: exit status 1");
        assert_eq!(err.kind().as_str(), "git-operation");
    }

    #[test]
    fn test_command_reports_start_failure() {
        let err = RunError::TestCommand {
            detail: "No such file or directory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Tests command failed to start: No such file or directory"
        );
        assert_eq!(err.kind().as_str(), "test-command");
    }
}
