//! Test-only helpers: throwaway git repositories and a scripted git fake.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;

use crate::core::policy::CheckedOut;
use crate::io::config::{BackupConfig, CONFIG_FILE_NAME};
use crate::io::git::{Git, PushResult, VersionControl, WorkingTreeStatus};

/// Run git in `dir`, failing on a non-zero exit. Returns trimmed stdout.
pub fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !out.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Temporary project directory, optionally with an initialized repository.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Initialized repository with a local identity and signing disabled.
    pub fn new() -> Result<Self> {
        let repo = Self::uninitialized()?;
        git_in(repo.root(), &["init"])?;
        git_in(repo.root(), &["config", "user.name", "Test User"])?;
        git_in(repo.root(), &["config", "user.email", "test@example.com"])?;
        git_in(repo.root(), &["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    /// Initialized repository whose unborn HEAD points at `branch`,
    /// whatever `init.defaultBranch` says.
    pub fn with_initial_branch(branch: &str) -> Result<Self> {
        let repo = Self::new()?;
        git_in(
            repo.root(),
            &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")],
        )?;
        Ok(repo)
    }

    /// Empty directory with no `.git`.
    pub fn uninitialized() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> Git {
        Git::new(self.root())
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    /// Write `.github_config.toml` for `config` into the project root.
    pub fn write_config(&self, config: &BackupConfig) -> Result<()> {
        let body = toml::to_string_pretty(config).context("serialize config toml")?;
        self.write_file(CONFIG_FILE_NAME, &body)
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        git_in(self.root(), &["add", "-A"])?;
        git_in(self.root(), &["commit", "-m", message])?;
        Ok(())
    }

    pub fn commit_count(&self) -> Result<usize> {
        let out = git_in(self.root(), &["rev-list", "--count", "HEAD"])?;
        out.parse().with_context(|| format!("parse commit count '{out}'"))
    }

    pub fn last_message(&self) -> Result<String> {
        git_in(self.root(), &["log", "-1", "--pretty=%s"])
    }
}

/// Bare repository standing in for the GitHub remote.
pub struct BareRemote {
    dir: TempDir,
}

impl BareRemote {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        git_in(dir.path(), &["init", "--bare"])?;
        Ok(Self { dir })
    }

    pub fn url(&self) -> String {
        self.dir.path().display().to_string()
    }

    /// Commit id of `branch` on the remote.
    pub fn branch_head(&self, branch: &str) -> Result<String> {
        git_in(self.dir.path(), &["rev-parse", &format!("refs/heads/{branch}")])
    }
}

/// Mutating call recorded by [`ScriptedVcs`]. Queries are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    SetConfig(String, String),
    AddRemote(String, String),
    SetRemoteUrl(String, String),
    RenameBranch(String),
    AddAll,
    Commit(String),
    Push(String, String),
}

/// In-memory [`VersionControl`] with scripted answers.
///
/// Pushes consume queued results in order and succeed once the queue is empty.
#[derive(Debug)]
pub struct ScriptedVcs {
    initialized: Cell<bool>,
    head: RefCell<CheckedOut>,
    remote: RefCell<Option<String>>,
    status: Option<WorkingTreeStatus>,
    push_results: RefCell<VecDeque<PushResult>>,
    fail_init: bool,
    fail_add: bool,
    fail_commit: Option<String>,
    calls: RefCell<Vec<Call>>,
}

impl Default for ScriptedVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedVcs {
    /// Commit id returned by `head_commit`.
    pub const HEAD: &'static str = "0123456789abcdef0123456789abcdef01234567";

    /// No repository yet, clean tree, branch `main`.
    pub fn new() -> Self {
        Self {
            initialized: Cell::new(false),
            head: RefCell::new(CheckedOut::Branch("main".to_string())),
            remote: RefCell::new(None),
            status: Some(WorkingTreeStatus::default()),
            push_results: RefCell::new(VecDeque::new()),
            fail_init: false,
            fail_add: false,
            fail_commit: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn initialized() -> Self {
        let vcs = Self::new();
        vcs.initialized.set(true);
        vcs
    }

    pub fn on_branch(self, branch: &str) -> Self {
        self.head.replace(CheckedOut::Branch(branch.to_string()));
        self
    }

    pub fn detached(self) -> Self {
        self.head.replace(CheckedOut::Detached);
        self
    }

    pub fn failing_current_branch(self) -> Self {
        self.head.replace(CheckedOut::Unknown);
        self
    }

    pub fn with_remote(self, url: &str) -> Self {
        self.remote.replace(Some(url.to_string()));
        self
    }

    pub fn with_status(mut self, status: WorkingTreeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn failing_status(mut self) -> Self {
        self.status = None;
        self
    }

    pub fn with_push_results(self, results: Vec<PushResult>) -> Self {
        self.push_results.replace(results.into());
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_add(mut self) -> Self {
        self.fail_add = true;
        self
    }

    pub fn failing_commit(mut self, stderr: &str) -> Self {
        self.fail_commit = Some(stderr.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl VersionControl for ScriptedVcs {
    fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    fn init(&self) -> Result<()> {
        self.record(Call::Init);
        if self.fail_init {
            return Err(anyhow!("git init failed: permission denied"));
        }
        self.initialized.set(true);
        Ok(())
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.record(Call::SetConfig(key.to_string(), value.to_string()));
        Ok(())
    }

    fn remote_url(&self, _remote: &str) -> Result<Option<String>> {
        Ok(self.remote.borrow().clone())
    }

    fn add_remote(&self, remote: &str, url: &str) -> Result<()> {
        self.record(Call::AddRemote(remote.to_string(), url.to_string()));
        self.remote.replace(Some(url.to_string()));
        Ok(())
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.record(Call::SetRemoteUrl(remote.to_string(), url.to_string()));
        self.remote.replace(Some(url.to_string()));
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        match &*self.head.borrow() {
            CheckedOut::Branch(name) => Ok(Some(name.clone())),
            CheckedOut::Detached => Ok(None),
            CheckedOut::Unknown => Err(anyhow!("git branch --show-current failed")),
        }
    }

    fn rename_branch(&self, new_name: &str) -> Result<()> {
        self.record(Call::RenameBranch(new_name.to_string()));
        self.head.replace(CheckedOut::Branch(new_name.to_string()));
        Ok(())
    }

    fn status(&self) -> Result<WorkingTreeStatus> {
        self.status
            .clone()
            .ok_or_else(|| anyhow!("git status --porcelain=v1 failed: not a git repository"))
    }

    fn add_all(&self) -> Result<()> {
        self.record(Call::AddAll);
        if self.fail_add {
            return Err(anyhow!("git add -A failed: index.lock exists"));
        }
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.record(Call::Commit(message.to_string()));
        match &self.fail_commit {
            Some(stderr) => Err(anyhow!("git commit failed: {stderr}")),
            None => Ok(()),
        }
    }

    fn head_commit(&self) -> Result<String> {
        Ok(Self::HEAD.to_string())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<PushResult> {
        self.record(Call::Push(remote.to_string(), branch.to_string()));
        Ok(self
            .push_results
            .borrow_mut()
            .pop_front()
            .unwrap_or(PushResult::Pushed))
    }
}
