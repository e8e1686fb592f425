//! Git adapter for backup runs.
//!
//! Every repository query and mutation shells out to the `git` binary. The
//! [`VersionControl`] trait is the seam the pipeline talks to, so tests can swap
//! in a scripted fake for failure paths real git cannot easily produce.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::{CommandOutput, run_bounded};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Working tree state as reported by porcelain status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    /// Raw porcelain output, echoed to the operator before staging.
    pub raw: String,
    pub entries: Vec<StatusEntry>,
}

impl WorkingTreeStatus {
    /// Lines that do not parse are left out of `entries` but still count
    /// toward [`has_changes`](Self::has_changes).
    pub fn from_porcelain(raw: String) -> Self {
        let entries = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match parse_status_line(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(err = %err, "skipping porcelain line");
                    None
                }
            })
            .collect();
        Self { raw, entries }
    }

    /// Any non-blank porcelain output means the tree is dirty.
    pub fn has_changes(&self) -> bool {
        !self.raw.trim().is_empty()
    }
}

/// Result of a push that git actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    Pushed,
    /// Git exited non-zero; `stderr` holds its diagnostic text.
    Rejected { stderr: String },
}

/// Repository operations a backup run needs.
///
/// `Err` from any method means the operation failed (for queries: git could not
/// answer). Negative answers that are part of normal flow, like a missing
/// remote or a rejected push, are `Ok` values.
pub trait VersionControl {
    /// True when the repository metadata directory exists.
    fn is_initialized(&self) -> bool;
    fn init(&self) -> Result<()>;
    fn set_config(&self, key: &str, value: &str) -> Result<()>;
    /// URL of `remote`, or `None` when it is not configured.
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;
    fn add_remote(&self, remote: &str, url: &str) -> Result<()>;
    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()>;
    /// Name of the checked-out branch, or `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<String>>;
    /// Force-rename the current branch.
    fn rename_branch(&self, new_name: &str) -> Result<()>;
    fn status(&self) -> Result<WorkingTreeStatus>;
    /// Stage all changes (respects .gitignore).
    fn add_all(&self) -> Result<()>;
    fn commit(&self, message: &str) -> Result<()>;
    /// Full id of the commit at HEAD.
    fn head_commit(&self) -> Result<String>;
    /// Push `branch` to `remote` with upstream tracking.
    fn push(&self, remote: &str, branch: &str) -> Result<PushResult>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound every git invocation by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(output.stdout_text())
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = output.stderr_text();
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0");
        let output = run_bounded(cmd, self.timeout, OUTPUT_LIMIT_BYTES)
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if output.timed_out {
            return Err(anyhow!(
                "git {} timed out after {}s",
                args.join(" "),
                self.timeout.as_secs()
            ));
        }
        Ok(output)
    }
}

impl VersionControl for Git {
    fn is_initialized(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    #[instrument(skip_all)]
    fn init(&self) -> Result<()> {
        debug!(workdir = %self.workdir.display(), "initializing repository");
        self.run_checked(&["init"])?;
        Ok(())
    }

    #[instrument(skip(self, value))]
    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.run_checked(&["config", key, value])?;
        Ok(())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        let output = self.run(&["remote", "get-url", remote])?;
        if !output.status.success() {
            debug!(remote, "remote not configured");
            return Ok(None);
        }
        Ok(Some(output.stdout_text().trim().to_string()))
    }

    #[instrument(skip_all, fields(remote))]
    fn add_remote(&self, remote: &str, url: &str) -> Result<()> {
        self.run_checked(&["remote", "add", remote, url])?;
        Ok(())
    }

    #[instrument(skip_all, fields(remote))]
    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.run_checked(&["remote", "set-url", remote, url])?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn current_branch(&self) -> Result<Option<String>> {
        let out = self.run_capture(&["branch", "--show-current"])?;
        let name = out.trim();
        if name.is_empty() {
            warn!("detached HEAD detected");
            return Ok(None);
        }
        debug!(branch = %name, "current branch");
        Ok(Some(name.to_string()))
    }

    #[instrument(skip_all, fields(new_name))]
    fn rename_branch(&self, new_name: &str) -> Result<()> {
        self.run_checked(&["branch", "-M", new_name])?;
        Ok(())
    }

    fn status(&self) -> Result<WorkingTreeStatus> {
        let out = self.run_capture(&["status", "--porcelain=v1"])?;
        Ok(WorkingTreeStatus::from_porcelain(out))
    }

    fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> Result<()> {
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(())
    }

    fn head_commit(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    #[instrument(skip_all, fields(remote, branch))]
    fn push(&self, remote: &str, branch: &str) -> Result<PushResult> {
        let output = self.run(&["push", "-u", remote, branch])?;
        if output.status.success() {
            debug!("push succeeded");
            return Ok(PushResult::Pushed);
        }
        let stderr = output.stderr_text();
        warn!(exit_code = ?output.status.code(), "push rejected");
        Ok(PushResult::Rejected {
            stderr: stderr.trim().to_string(),
        })
    }
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}
