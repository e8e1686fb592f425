//! Failure classes of a backup run.

use thiserror::Error;

use crate::exit_codes;

/// Terminal failure of a backup run. Each variant maps to one exit code.
///
/// Details carry the full context chain of the underlying git failure,
/// including whatever git wrote to stderr.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("configuration missing or invalid: {0}")]
    Config(String),

    #[error("repository initialization failed: {0}")]
    Init(String),

    #[error("repository_url is not set in the configuration")]
    MissingRepositoryUrl,

    #[error("remote configuration failed: {0}")]
    Remote(String),

    #[error("staging failed: {0}")]
    Stage(String),

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("push of {commit} to {remote}/{branch} failed: {detail}")]
    Push {
        remote: String,
        branch: String,
        commit: String,
        detail: String,
    },

    /// The commit exists locally but belongs to no branch, so there is
    /// nothing to push by name.
    #[error("commit {commit} was made on a detached HEAD and was not pushed")]
    DetachedHead { commit: String },
}

impl BackupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_codes::CONFIG,
            Self::Init(_) => exit_codes::INIT,
            Self::MissingRepositoryUrl | Self::Remote(_) => exit_codes::REMOTE,
            Self::Stage(_) => exit_codes::STAGE,
            Self::Commit(_) => exit_codes::COMMIT,
            Self::Push { .. } | Self::DetachedHead { .. } => exit_codes::PUSH,
        }
    }
}

/// Render an `anyhow` error with its whole context chain.
pub(crate) fn detail(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_class_has_a_distinct_code() {
        let errors = [
            BackupError::Config("x".into()),
            BackupError::Init("x".into()),
            BackupError::Remote("x".into()),
            BackupError::Stage("x".into()),
            BackupError::Commit("x".into()),
            BackupError::Push {
                remote: "origin".into(),
                branch: "main".into(),
                commit: "abc".into(),
                detail: "x".into(),
            },
        ];
        let codes: Vec<i32> = errors.iter().map(BackupError::exit_code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn missing_url_shares_the_remote_code() {
        assert_eq!(
            BackupError::MissingRepositoryUrl.exit_code(),
            exit_codes::REMOTE
        );
    }

    #[test]
    fn detached_head_shares_the_push_code() {
        let err = BackupError::DetachedHead {
            commit: "abc".into(),
        };
        assert_eq!(err.exit_code(), exit_codes::PUSH);
        assert!(err.to_string().contains("abc"));
    }
}
