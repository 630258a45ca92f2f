//! Workspace configuration stored under `.voratiq/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Voratiq configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields fall back to
/// the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VoratiqConfig {
    /// First segment of every agent branch (`<namespace>/run/<runId>/<agentId>`).
    pub branch_namespace: String,

    /// Shell used for verification commands, invoked as `<shell> -c <command>`.
    pub shell: String,

    /// Verification command used when `run` is not given `--test-command`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,

    /// Spec path used when `run` is not given `--spec`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_spec: Option<String>,

    pub commit_author: CommitAuthor,
}

/// Identity recorded on every agent commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "Voratiq Orchestrator".to_string(),
            email: "cli@voratiq".to_string(),
        }
    }
}

impl Default for VoratiqConfig {
    fn default() -> Self {
        Self {
            branch_namespace: "voratiq".to_string(),
            shell: "/bin/sh".to_string(),
            test_command: None,
            default_spec: None,
            commit_author: CommitAuthor::default(),
        }
    }
}

impl VoratiqConfig {
    pub fn validate(&self) -> Result<()> {
        let namespace = self.branch_namespace.trim();
        if namespace.is_empty() {
            return Err(anyhow!("branch_namespace must be non-empty"));
        }
        if namespace.contains(char::is_whitespace) || namespace.ends_with('/') {
            return Err(anyhow!(
                "branch_namespace must not contain whitespace or end with '/'"
            ));
        }
        if self.shell.trim().is_empty() {
            return Err(anyhow!("shell must be non-empty"));
        }
        if self
            .test_command
            .as_deref()
            .is_some_and(|command| command.trim().is_empty())
        {
            return Err(anyhow!("test_command must not be blank when set"));
        }
        if self.commit_author.name.trim().is_empty() || self.commit_author.email.trim().is_empty()
        {
            return Err(anyhow!("commit_author.name and commit_author.email must be set"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `VoratiqConfig::default()`.
pub fn load_config(path: &Path) -> Result<VoratiqConfig> {
    if !path.exists() {
        let cfg = VoratiqConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: VoratiqConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &VoratiqConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, VoratiqConfig::default());
        assert_eq!(cfg.commit_author.email, "cli@voratiq");
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = VoratiqConfig {
            test_command: Some("just ci".to_string()),
            ..VoratiqConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
        assert!(!temp.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "shell = \"/bin/bash\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.shell, "/bin/bash");
        assert_eq!(cfg.branch_namespace, "voratiq");
    }

    #[test]
    fn blank_test_command_is_invalid() {
        let cfg = VoratiqConfig {
            test_command: Some("   ".to_string()),
            ..VoratiqConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("test_command"));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "shell = [").expect("write");

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
