//! Backup configuration stored in `.github_config.toml` at the project root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// File name of the configuration, relative to the project root.
pub const CONFIG_FILE_NAME: &str = ".github_config.toml";

/// Backup configuration (TOML).
///
/// Only `repository_url` is needed for a first run; everything else has a
/// default or is skipped when absent. Empty strings count as absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupConfig {
    /// Remote endpoint the backups are pushed to.
    pub repository_url: Option<String>,

    /// `user.name` applied to a freshly initialized repository.
    pub git_user_name: Option<String>,

    /// `user.email` applied to a freshly initialized repository.
    pub git_user_email: Option<String>,

    /// Branch to push when the current branch cannot be determined.
    pub default_branch: String,

    pub remote_name: String,

    /// Upper bound for any single git invocation.
    pub command_timeout_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            repository_url: None,
            git_user_name: None,
            git_user_email: None,
            default_branch: "main".to_string(),
            remote_name: "origin".to_string(),
            command_timeout_secs: 600,
        }
    }
}

impl BackupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_branch.trim().is_empty() {
            return Err(anyhow!("default_branch must not be empty"));
        }
        if self.remote_name.trim().is_empty() {
            return Err(anyhow!("remote_name must not be empty"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn repository_url(&self) -> Option<&str> {
        non_empty(&self.repository_url)
    }

    pub fn git_user_name(&self) -> Option<&str> {
        non_empty(&self.git_user_name)
    }

    pub fn git_user_email(&self) -> Option<&str> {
        non_empty(&self.git_user_email)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Project root for an executable at `exe`: the parent of its directory.
///
/// `<root>/bin/backup` resolves to `<root>`.
pub fn project_root_for(exe: &Path) -> Result<PathBuf> {
    let bin_dir = exe
        .parent()
        .with_context(|| format!("executable path has no parent {}", exe.display()))?;
    let root = bin_dir
        .parent()
        .with_context(|| format!("executable directory has no parent {}", bin_dir.display()))?;
    Ok(root.to_path_buf())
}

/// Load config from a TOML file.
///
/// A missing, empty or unparsable file is an error.
pub fn load_config(path: &Path) -> Result<BackupConfig> {
    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if contents.trim().is_empty() {
        return Err(anyhow!("config file is empty: {}", path.display()));
    }
    let cfg: BackupConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
