//! Report projections and their consistency checks.
//!
//! Reports are derived from the persisted records plus pipeline telemetry.
//! The run-level failure flags are computed twice: once by the coordinator
//! while agents complete, once here from the reports. A disagreement means the
//! bookkeeping is broken, so it is surfaced as an error instead of being
//! silently corrected.

use thiserror::Error;

use super::types::{
    AgentExecutionState, AgentInvocationRecord, AgentReport, AgentStatus, RunRecord, RunReport,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportInvariantError {
    #[error("hadAgentFailure mismatch for run {run_id}: reported {reported}, derived {derived}")]
    AgentFailureMismatch {
        run_id: String,
        reported: bool,
        derived: bool,
    },
    #[error("hadTestFailure mismatch for run {run_id}: reported {reported}, derived {derived}")]
    TestFailureMismatch {
        run_id: String,
        reported: bool,
        derived: bool,
    },
}

pub fn to_agent_report(record: &AgentInvocationRecord, state: AgentExecutionState) -> AgentReport {
    AgentReport {
        agent_id: record.agent_id.clone(),
        status: record.status,
        change_summary: record.change_summary.clone(),
        assets: record.assets.clone(),
        tests: record.tests.clone(),
        error: record.error.clone(),
        diff_attempted: state.diff_attempted,
        diff_captured: state.diff_captured,
        tests_attempted: state.tests_attempted,
    }
}

/// OR over agents of `status == failed`.
pub fn derive_agent_failure(agents: &[AgentReport]) -> bool {
    agents
        .iter()
        .any(|agent| agent.status == AgentStatus::Failed)
}

/// OR over agents of `tests_attempted && (tests failed || tests errored)`.
pub fn derive_test_failure(agents: &[AgentReport]) -> bool {
    agents.iter().any(AgentReport::had_test_failure)
}

/// Build the run report, checking the caller's flags against the agents.
pub fn to_run_report(
    record: &RunRecord,
    agents: Vec<AgentReport>,
    had_agent_failure: bool,
    had_test_failure: bool,
) -> Result<RunReport, ReportInvariantError> {
    let derived_agent_failure = derive_agent_failure(&agents);
    if derived_agent_failure != had_agent_failure {
        return Err(ReportInvariantError::AgentFailureMismatch {
            run_id: record.run_id.clone(),
            reported: had_agent_failure,
            derived: derived_agent_failure,
        });
    }

    let derived_test_failure = derive_test_failure(&agents);
    if derived_test_failure != had_test_failure {
        return Err(ReportInvariantError::TestFailureMismatch {
            run_id: record.run_id.clone(),
            reported: had_test_failure,
            derived: derived_test_failure,
        });
    }

    Ok(RunReport {
        run_id: record.run_id.clone(),
        spec: record.spec.clone(),
        agents,
        had_agent_failure,
        had_test_failure,
    })
}
