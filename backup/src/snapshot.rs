//! Staging the working tree and recording a backup commit.

use tracing::{debug, info};

use crate::core::message::commit_message_now;
use crate::error::{BackupError, detail};
use crate::io::git::VersionControl;

/// Stage every change in the working tree, honoring git's ignore rules.
pub fn stage_all<V: VersionControl>(vcs: &V) -> Result<(), BackupError> {
    debug!("staging all changes");
    vcs.add_all().map_err(|err| BackupError::Stage(detail(&err)))
}

/// Commit what is staged and return the new commit id.
///
/// Without an explicit `message`, the commit is stamped `Backup: <local time>`.
pub fn commit_snapshot<V: VersionControl>(
    vcs: &V,
    message: Option<&str>,
) -> Result<String, BackupError> {
    let message = message.map_or_else(commit_message_now, str::to_string);
    vcs.commit(&message)
        .map_err(|err| BackupError::Commit(detail(&err)))?;
    let commit = vcs
        .head_commit()
        .map_err(|err| BackupError::Commit(detail(&err)))?;
    info!(%commit, "commit created");
    println!("Commit created: {commit}");
    Ok(commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, ScriptedVcs};

    #[test]
    fn explicit_message_is_used_verbatim() {
        let vcs = ScriptedVcs::initialized();
        let commit = commit_snapshot(&vcs, Some("nightly")).expect("commit");
        assert_eq!(commit, ScriptedVcs::HEAD);
        assert_eq!(vcs.calls(), vec![Call::Commit("nightly".into())]);
    }

    #[test]
    fn default_message_is_timestamped() {
        let vcs = ScriptedVcs::initialized();
        commit_snapshot(&vcs, None).expect("commit");
        let calls = vcs.calls();
        let Some(Call::Commit(message)) = calls.first() else {
            panic!("expected a commit call, got {calls:?}");
        };
        assert!(message.starts_with("Backup: "), "message: {message}");
        assert_eq!(message.len(), "Backup: 2024-01-01 00:00:00".len());
    }

    #[test]
    fn commit_failure_keeps_git_diagnostics() {
        let vcs = ScriptedVcs::initialized().failing_commit("nothing added to commit");
        let err = commit_snapshot(&vcs, None).unwrap_err();
        let BackupError::Commit(text) = err else {
            panic!("expected commit error");
        };
        assert!(text.contains("nothing added to commit"));
    }

    #[test]
    fn staging_failure_maps_to_stage_error() {
        let vcs = ScriptedVcs::initialized().failing_add();
        assert!(matches!(stage_all(&vcs), Err(BackupError::Stage(_))));
    }
}
