//! Pushing the backup commit, with a single fallback to `master`.

use tracing::{info, warn};

use crate::core::policy::{CheckedOut, FALLBACK_BRANCH, is_branch_mismatch, push_branch};
use crate::error::{BackupError, detail};
use crate::io::config::BackupConfig;
use crate::io::git::{PushResult, VersionControl};

/// Push `commit` and return the branch that reached the remote.
///
/// The checked-out branch is pushed with upstream tracking. If git rejects it
/// with diagnostics mentioning `main` or `master`, the push is retried once
/// against `master`. A commit made on a detached HEAD is not pushed.
pub fn publish<V: VersionControl>(
    vcs: &V,
    config: &BackupConfig,
    checked_out: &CheckedOut,
    commit: &str,
) -> Result<String, BackupError> {
    let Some(branch) = push_branch(checked_out, &config.default_branch) else {
        warn!(%commit, "HEAD is detached, not pushing");
        return Err(BackupError::DetachedHead {
            commit: commit.to_string(),
        });
    };
    let branch = branch.to_string();
    let remote = config.remote_name.as_str();
    let failed = |detail: String| BackupError::Push {
        remote: remote.to_string(),
        branch: branch.clone(),
        commit: commit.to_string(),
        detail,
    };

    let stderr = match vcs.push(remote, &branch).map_err(|err| failed(detail(&err)))? {
        PushResult::Pushed => {
            info!(remote, %branch, "pushed");
            println!("Pushed to {remote} (branch: {branch})");
            return Ok(branch.clone());
        }
        PushResult::Rejected { stderr } => stderr,
    };

    eprintln!("Push to {remote} failed.");
    if !stderr.is_empty() {
        eprintln!("Git output: {stderr}");
    }
    if !is_branch_mismatch(&stderr) {
        return Err(failed(stderr));
    }

    warn!(remote, %branch, "push rejected over branch name, retrying");
    eprintln!("Hint: retrying with branch '{FALLBACK_BRANCH}'...");
    match vcs.push(remote, FALLBACK_BRANCH) {
        Ok(PushResult::Pushed) => {
            info!(remote, branch = FALLBACK_BRANCH, "pushed on fallback branch");
            println!("Pushed to {remote} (branch: {FALLBACK_BRANCH})");
            Ok(FALLBACK_BRANCH.to_string())
        }
        Ok(PushResult::Rejected { stderr: retry }) => Err(failed(format!(
            "{stderr}\nretry on '{FALLBACK_BRANCH}': {retry}"
        ))),
        Err(err) => Err(failed(format!(
            "{stderr}\nretry on '{FALLBACK_BRANCH}': {}",
            detail(&err)
        ))),
    }
}
