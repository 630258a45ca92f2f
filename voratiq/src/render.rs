//! Human-readable rendering of run reports and run history.

use crate::core::types::{AgentReport, AgentStatus, RunRecord, RunReport, TestStatus};

/// Render the end-of-run summary printed by `voratiq run`.
pub fn render_run_summary(report: &RunReport) -> String {
    let mut lines: Vec<String> = vec![
        String::new(),
        format!("Running agents against spec: {}", report.spec.path),
        format!("Run ID: {}", report.run_id),
        String::new(),
    ];

    for (index, agent) in report.agents.iter().enumerate() {
        if index > 0 {
            lines.push(String::new());
        }
        render_agent(agent, &mut lines);
    }

    lines.push(String::new());
    lines.push("Run complete. To review results, run:".to_string());
    lines.push(format!("  voratiq show {}", report.run_id));
    lines.join("\n")
}

fn render_agent(agent: &AgentReport, lines: &mut Vec<String>) {
    lines.push(format!("{}:", agent.agent_id));
    lines.push("  - Running agent...".to_string());
    if agent.diff_attempted {
        lines.push("  - Capturing diff...".to_string());
    }
    if agent.tests_attempted {
        lines.push("  - Running tests...".to_string());
    }
    lines.push(format!("  - Status: {}", agent.status.as_str()));

    if let Some(tests) = agent.tests.as_ref().filter(|_| agent.tests_attempted) {
        let suffix = match (tests.status, tests.exit_code) {
            (TestStatus::Failed, Some(code)) => format!(" (exit code {code})"),
            (TestStatus::Failed, None) => " (exit code unknown)".to_string(),
            _ => String::new(),
        };
        lines.push(format!("  - Tests: {}{suffix}", tests.status.as_str()));
        if let Some(error) = &tests.error {
            lines.push(format!("  - Tests error: {error}"));
        }
    }

    if let Some(changes) = &agent.change_summary {
        lines.push(format!("  - Changes: {changes}"));
    }
    if let Some(error) = &agent.error {
        lines.push(format!("  - Error: {error}"));
    }

    lines.push("  - Artifacts:".to_string());
    lines.push(format!("    - stdout: {}", agent.assets.stdout));
    lines.push(format!("    - stderr: {}", agent.assets.stderr));
    if let Some(diff) = &agent.assets.diff {
        lines.push(format!("    - diff: {diff}"));
    }
    if let Some(tests) = &agent.assets.tests {
        lines.push(format!("    - tests: {tests}"));
    }
}

/// One line per recorded run: id, creation time, spec and agent outcomes.
pub fn render_run_list(records: &[RunRecord]) -> String {
    if records.is_empty() {
        return "No runs recorded.".to_string();
    }
    records
        .iter()
        .map(|record| {
            let succeeded = record
                .agents
                .iter()
                .filter(|agent| agent.status == AgentStatus::Succeeded)
                .count();
            let failed = record.agents.len() - succeeded;
            format!(
                "{}  {}  {}  succeeded={succeeded} failed={failed}",
                record.run_id, record.created_at, record.spec.path
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
