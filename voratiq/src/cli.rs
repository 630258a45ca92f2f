//! CLI command implementations.
//!
//! Commands take the repository root explicitly and return what they would
//! print, so the binary stays a thin dispatcher.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::agents::catalog::load_agent_catalog;
use crate::core::path::relative_to_root;
use crate::core::types::RunReport;
use crate::io::process::ProcessEnv;
use crate::io::records::{find_run, read_run_records};
use crate::io::workspace::{InitReport, init_workspace, validate_workspace};
use crate::render::render_run_list;
use crate::run::{RunRequest, execute_run};

/// Arguments accepted by `voratiq run`.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub spec: Option<String>,
    pub test_command: Option<String>,
    pub run_id: Option<String>,
}

/// A spec path resolved against the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub absolute_path: PathBuf,
    pub display_path: String,
}

/// Bootstrap `.voratiq/` and describe what was created.
pub fn cmd_init(root: &Path) -> Result<String> {
    let report = init_workspace(root)?;
    Ok(render_init(&report))
}

fn render_init(report: &InitReport) -> String {
    if report.created_directories.is_empty() && report.created_files.is_empty() {
        return "Voratiq workspace already initialized.".to_string();
    }
    let mut lines = vec!["Initialized voratiq workspace:".to_string()];
    for entry in report
        .created_directories
        .iter()
        .chain(report.created_files.iter())
    {
        lines.push(format!("  - {entry}"));
    }
    lines.join("\n")
}

/// Validate the workspace, load the catalog and execute a run.
///
/// `env` is the ambient environment: it supplies the agent catalog and is
/// passed on to every agent process.
pub fn cmd_run(root: &Path, args: &RunArgs, env: ProcessEnv) -> Result<RunReport> {
    let workspace = validate_workspace(root)?;
    let config = workspace.config;

    let spec_arg = args
        .spec
        .clone()
        .or_else(|| config.default_spec.clone())
        .context("No spec provided. Pass --spec <path> or set default_spec in .voratiq/config.toml")?;
    let spec = resolve_spec_path(root, &spec_arg)?;
    debug!(spec = %spec.display_path, "resolved spec");

    let agents = load_agent_catalog(&env, root)?;
    let test_command = args
        .test_command
        .clone()
        .or_else(|| config.test_command.clone());
    info!(agents = agents.len(), has_tests = test_command.is_some(), "running agents");

    let report = execute_run(&RunRequest {
        root: root.to_path_buf(),
        spec_path: spec.absolute_path,
        spec_display_path: spec.display_path,
        agents,
        test_command,
        run_id: args.run_id.clone(),
        config,
        ambient_env: env,
    })?;
    Ok(report)
}

/// Resolve `spec` against `root` and require it to be an existing file.
pub fn resolve_spec_path(root: &Path, spec: &str) -> Result<ResolvedSpec> {
    let candidate = Path::new(spec);
    let absolute_path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let display_path = relative_to_root(root, &absolute_path);
    if !absolute_path.is_file() {
        bail!("Spec file not found: {display_path}");
    }
    Ok(ResolvedSpec {
        absolute_path,
        display_path,
    })
}

/// One line per recorded run.
pub fn cmd_list(root: &Path) -> Result<String> {
    let workspace = validate_workspace(root)?;
    let records = read_run_records(&workspace.paths.runs_file)?;
    Ok(render_run_list(&records))
}

/// Pretty JSON for one recorded run.
pub fn cmd_show(root: &Path, run_id: &str) -> Result<String> {
    let workspace = validate_workspace(root)?;
    let records = read_run_records(&workspace.paths.runs_file)?;
    let record = find_run(&records, run_id)?;
    serde_json::to_string_pretty(record).context("serialize run record")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn spec_paths_resolve_relative_to_root() {
        let repo = TestRepo::new().expect("repo");
        repo.write_file("specs/task.md", "# Task\n").expect("write");

        let spec = resolve_spec_path(repo.root(), "specs/task.md").expect("resolve");
        assert_eq!(spec.display_path, "specs/task.md");
        assert_eq!(spec.absolute_path, repo.root().join("specs/task.md"));

        let absolute = repo.root().join("specs/task.md");
        let spec = resolve_spec_path(repo.root(), &absolute.display().to_string())
            .expect("resolve absolute");
        assert_eq!(spec.display_path, "specs/task.md");
    }

    #[test]
    fn missing_spec_is_reported_with_display_path() {
        let repo = TestRepo::new().expect("repo");
        let err = resolve_spec_path(repo.root(), "specs/missing.md").unwrap_err();
        assert_eq!(err.to_string(), "Spec file not found: specs/missing.md");
    }

    #[test]
    fn init_output_lists_created_entries_once() {
        let repo = TestRepo::new().expect("repo");
        let first = cmd_init(repo.root()).expect("init");
        assert!(first.contains(".voratiq/runs.jsonl"));

        let second = cmd_init(repo.root()).expect("re-init");
        assert_eq!(second, "Voratiq workspace already initialized.");
    }

    #[test]
    fn run_without_spec_or_default_fails() {
        let repo = TestRepo::new().expect("repo");
        cmd_init(repo.root()).expect("init");

        let err = cmd_run(repo.root(), &RunArgs::default(), ProcessEnv::new()).unwrap_err();
        assert!(err.to_string().starts_with("No spec provided"));
    }

    #[test]
    fn show_unknown_run_is_not_found() {
        let repo = TestRepo::new().expect("repo");
        cmd_init(repo.root()).expect("init");
        fs::write(repo.root().join(".voratiq/runs.jsonl"), "").expect("write");

        let err = cmd_show(repo.root(), "nope").unwrap_err();
        assert_eq!(err.to_string(), "Run not found: nope");
        assert_eq!(cmd_list(repo.root()).expect("list"), "No runs recorded.");
    }
}
