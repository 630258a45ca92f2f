//! Git adapter for the run engine.
//!
//! Every agent gets its own worktree and branch, and change capture commits
//! with a fixed identity, so we keep a small, explicit wrapper around `git`
//! subprocess calls. Failures keep the tool's stderr so callers can tell a
//! missing repository apart from a failing command.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::io::config::CommitAuthor;

#[derive(Debug, Error)]
pub enum GitError {
    #[error(
        "Failed to locate .git metadata in {}. Run `voratiq init` from the repository root.",
        .path.display()
    )]
    NotARepository { path: PathBuf },

    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    #[error("spawn git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },
}

pub type GitResult<T> = Result<T, GitError>;

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Fail with [`GitError::NotARepository`] unless `.git` exists in the workdir.
    pub fn assert_repository(&self) -> GitResult<()> {
        if self.workdir.join(".git").exists() {
            return Ok(());
        }
        Err(GitError::NotARepository {
            path: self.workdir.clone(),
        })
    }

    /// Full SHA of `HEAD`.
    #[instrument(skip_all)]
    pub fn head_revision(&self) -> GitResult<String> {
        let out = self.run_capture(&["rev-parse", "HEAD"])?;
        let revision = out.trim().to_string();
        debug!(revision = %revision, "resolved head revision");
        Ok(revision)
    }

    /// Create a worktree at `destination` on a new `branch` starting at `base`.
    ///
    /// `destination` may already exist as long as it is empty.
    #[instrument(skip_all, fields(branch = %branch, destination = %destination.display()))]
    pub fn create_worktree(&self, destination: &Path, branch: &str, base: &str) -> GitResult<()> {
        let destination = destination.to_string_lossy();
        debug!("adding worktree");
        self.run_checked(&["worktree", "add", "-b", branch, &destination, base])?;
        Ok(())
    }

    /// True if the worktree has any tracked modification or untracked file.
    pub fn has_uncommitted_changes(&self) -> GitResult<bool> {
        let out = self.run_capture(&["status", "--porcelain"])?;
        let dirty = !out.trim().is_empty();
        debug!(dirty, "worktree status");
        Ok(dirty)
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> GitResult<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> GitResult<bool> {
        let out = self.run_capture(&["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    /// Commit staged changes as `author` and return the new commit id.
    #[instrument(skip_all, fields(author = %author.email))]
    pub fn commit_all(&self, message: &str, author: &CommitAuthor) -> GitResult<String> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        self.run_checked(&["-c", &name, "-c", &email, "commit", "-m", message])?;
        let commit = self.head_revision()?;
        debug!(commit = %commit, "committed staged changes");
        Ok(commit)
    }

    /// Patch text between two revisions.
    pub fn diff(&self, base: &str, target: &str) -> GitResult<String> {
        self.run_capture(&["diff", base, target])
    }

    /// `git diff --shortstat` between two revisions, `None` for an empty diff.
    pub fn diff_shortstat(&self, base: &str, target: &str) -> GitResult<Option<String>> {
        let out = self.run_capture(&["diff", "--shortstat", base, target])?;
        let stat = out.trim();
        if stat.is_empty() {
            return Ok(None);
        }
        Ok(Some(stat.to_string()))
    }

    fn run_capture(&self, args: &[&str]) -> GitResult<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> GitResult<Output> {
        let output = self.run(args)?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("not a git repository") {
            warn!(workdir = %self.workdir.display(), "git reports missing repository");
            return Err(GitError::NotARepository {
                path: self.workdir.clone(),
            });
        }
        Err(GitError::CommandFailed {
            args: args.join(" "),
            stderr,
        })
    }

    fn run(&self, args: &[&str]) -> GitResult<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| GitError::Spawn {
                args: args.join(" "),
                source,
            })
    }
}
