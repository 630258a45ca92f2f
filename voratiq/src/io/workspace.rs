//! `.voratiq/` scaffolding and validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, instrument};

use super::config::{VoratiqConfig, load_config, write_config};
use crate::core::path::relative_to_root;
use crate::io::git::Git;

pub const VORATIQ_DIR: &str = ".voratiq";
pub const RUNS_DIR: &str = "runs";
pub const RUNS_FILE: &str = "runs.jsonl";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("Missing workspace entry: {path}")]
    MissingEntry { path: String },

    #[error("Invalid workspace config at {path}: {details}")]
    InvalidConfig { path: String, details: String },
}

/// All canonical paths within `.voratiq/` for a repository root.
#[derive(Debug, Clone)]
pub struct VoratiqPaths {
    pub root: PathBuf,
    pub voratiq_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub runs_file: PathBuf,
    pub config_path: PathBuf,
}

impl VoratiqPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let voratiq_dir = root.join(VORATIQ_DIR);
        Self {
            root,
            runs_dir: voratiq_dir.join(RUNS_DIR),
            runs_file: voratiq_dir.join(RUNS_FILE),
            config_path: voratiq_dir.join(CONFIG_FILE),
            voratiq_dir,
        }
    }

    /// Root-relative display form of `path`.
    pub fn display(&self, path: &Path) -> String {
        relative_to_root(&self.root, path)
    }
}

/// Entries created by [`init_workspace`], root-relative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub created_directories: Vec<String>,
    pub created_files: Vec<String>,
}

/// A validated workspace: paths plus the loaded configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub paths: VoratiqPaths,
    pub config: VoratiqConfig,
}

/// Create any missing `.voratiq/` entries under `root`.
///
/// Existing entries are left untouched, so running this twice is harmless.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn init_workspace(root: &Path) -> Result<InitReport> {
    Git::new(root).assert_repository()?;
    let paths = VoratiqPaths::new(root);
    let mut report = InitReport::default();

    for dir in [&paths.voratiq_dir, &paths.runs_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
            report.created_directories.push(paths.display(dir));
        }
    }

    if !paths.config_path.exists() {
        write_config(&paths.config_path, &VoratiqConfig::default())?;
        report.created_files.push(paths.display(&paths.config_path));
    }

    if !paths.runs_file.exists() {
        fs::write(&paths.runs_file, "")
            .with_context(|| format!("write file {}", paths.runs_file.display()))?;
        report.created_files.push(paths.display(&paths.runs_file));
    }

    debug!(
        directories = report.created_directories.len(),
        files = report.created_files.len(),
        "workspace initialized"
    );
    validate_workspace(root)?;
    Ok(report)
}

/// Check the repository and `.voratiq/` layout, then load the config.
///
/// Reports the first missing entry in scaffold order.
pub fn validate_workspace(root: &Path) -> Result<Workspace> {
    Git::new(root).assert_repository()?;
    let paths = VoratiqPaths::new(root);

    ensure_dir(&paths, &paths.voratiq_dir)?;
    ensure_dir(&paths, &paths.runs_dir)?;
    ensure_file(&paths, &paths.config_path)?;
    let config = load_config(&paths.config_path).map_err(|err| WorkspaceError::InvalidConfig {
        path: paths.display(&paths.config_path),
        details: format!("{err:#}"),
    })?;
    ensure_file(&paths, &paths.runs_file)?;

    Ok(Workspace { paths, config })
}

fn ensure_dir(paths: &VoratiqPaths, dir: &Path) -> Result<(), WorkspaceError> {
    if dir.is_dir() {
        return Ok(());
    }
    Err(WorkspaceError::MissingEntry {
        path: paths.display(dir),
    })
}

fn ensure_file(paths: &VoratiqPaths, file: &Path) -> Result<(), WorkspaceError> {
    if file.is_file() {
        return Ok(());
    }
    Err(WorkspaceError::MissingEntry {
        path: paths.display(file),
    })
}
