//! Orchestration for a single backup run.
//!
//! The run moves strictly forward: load config, ensure the repository and its
//! remote, inspect the working tree, then stage, commit and push. The first
//! failing step ends the run with its [`BackupError`]; nothing already done
//! locally is rolled back.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{BackupError, detail};
use crate::io::config::{BackupConfig, CONFIG_FILE_NAME, load_config};
use crate::io::git::{Git, VersionControl};
use crate::publish::publish;
use crate::setup::{ensure_initialized, ensure_remote, normalize_branch};
use crate::snapshot::{commit_snapshot, stage_all};

/// Successful end of a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Working tree was clean; no commit was made.
    NoChanges,
    Published { commit: String, branch: String },
}

/// Load `<root>/.github_config.toml` and back up `root` with real git.
pub fn backup_project(root: &Path) -> Result<BackupOutcome, BackupError> {
    let config_path = root.join(CONFIG_FILE_NAME);
    let config = load_config(&config_path).map_err(|err| BackupError::Config(detail(&err)))?;
    debug!(config = ?config, "configuration loaded");
    let git = Git::new(root).with_timeout(config.command_timeout());
    run_backup(&git, &config, None)
}

/// Run every backup step against `vcs`.
///
/// `message` overrides the default timestamped commit message.
pub fn run_backup<V: VersionControl>(
    vcs: &V,
    config: &BackupConfig,
    message: Option<&str>,
) -> Result<BackupOutcome, BackupError> {
    ensure_initialized(vcs, config)?;
    let checked_out = normalize_branch(vcs, config);
    debug!(?checked_out, "branch normalized");
    ensure_remote(vcs, config)?;

    let status = vcs
        .status()
        .map_err(|err| BackupError::Stage(detail(&err)))?;
    if !status.has_changes() {
        info!("working tree clean");
        println!("No changes to commit.");
        return Ok(BackupOutcome::NoChanges);
    }

    info!(changed = status.entries.len(), "changes found");
    println!("Changes found:");
    println!("{}", status.raw.trim_end());

    stage_all(vcs)?;
    let commit = commit_snapshot(vcs, message)?;
    let branch = publish(vcs, config, &checked_out, &commit)?;

    println!("Backup completed successfully.");
    println!("Commit: {commit}");
    Ok(BackupOutcome::Published { commit, branch })
}
