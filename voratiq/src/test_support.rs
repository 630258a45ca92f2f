//! Test-only helpers: throwaway git repositories and shell-script agents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::agents::AgentDefinition;
use crate::io::process::ProcessEnv;
use crate::io::workspace::{InitReport, init_workspace};

/// A temporary git repository with one initial commit.
///
/// Agent scripts live in a separate directory so they never show up in the
/// repository or its worktrees.
pub struct TestRepo {
    dir: TempDir,
    scripts: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create repo tempdir")?;
        let scripts = tempfile::tempdir().context("create scripts tempdir")?;
        let repo = Self { dir, scripts };

        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "test@example.com"])?;
        repo.git(&["config", "user.name", "Test"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.write_file("README.md", "hello\n")?;
        repo.commit_all("chore: init")?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-q", "-m", message])
    }

    pub fn init_workspace(&self) -> Result<InitReport> {
        init_workspace(self.root())
    }

    /// Write a POSIX shell script outside the repository.
    ///
    /// The script is not marked executable; pair it with [`script_agent`],
    /// which runs it through `/bin/sh`.
    pub fn write_agent_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        let path = self.scripts.path().join(format!("{name}.sh"));
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Write an executable script outside the repository.
    #[cfg(unix)]
    pub fn write_executable(&self, name: &str, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.scripts.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {}", path.display()))?;
        Ok(path)
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.root())
            .output()
            .with_context(|| format!("git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// An agent that runs `script` with `/bin/sh`; the prompt arrives as `$1`
/// and on stdin.
pub fn script_agent(id: &str, script: &Path) -> AgentDefinition {
    AgentDefinition {
        id: id.to_string(),
        model: format!("{id}-model"),
        binary_path: PathBuf::from("/bin/sh"),
        argv: vec![script.display().to_string()],
    }
}

/// Minimal child environment: `PATH` and `HOME` from the test process.
pub fn test_env() -> ProcessEnv {
    let mut env = ProcessEnv::new();
    env.insert(
        "PATH".to_string(),
        std::env::var("PATH").unwrap_or_else(|_| "/usr/local/bin:/usr/bin:/bin".to_string()),
    );
    if let Ok(home) = std::env::var("HOME") {
        env.insert("HOME".to_string(), home);
    }
    env
}
