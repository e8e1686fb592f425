//! Branch and push decisions.

/// Branch tried once more when a push fails over a branch name.
pub const FALLBACK_BRANCH: &str = "master";

/// Branch assumed when git cannot report the current one.
pub const UNKNOWN_BRANCH_DEFAULT: &str = "master";

/// What HEAD points at, as far as git could tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckedOut {
    Branch(String),
    /// HEAD is a bare commit; new commits belong to no branch.
    Detached,
    /// The branch query itself failed.
    Unknown,
}

impl CheckedOut {
    /// Name used for the master→main rule. Unknown counts as `master`.
    pub fn rename_candidate(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name),
            Self::Unknown => Some(UNKNOWN_BRANCH_DEFAULT),
            Self::Detached => None,
        }
    }
}

/// True when push diagnostics point at a `main`/`master` naming mismatch.
pub fn is_branch_mismatch(stderr: &str) -> bool {
    stderr.contains("main") || stderr.contains("master")
}

/// Rename `master` to `main` only when the config asks for `main`.
pub fn should_rename_to_main(current: &str, default_branch: &str) -> bool {
    current == "master" && default_branch == "main"
}

/// Branch to push: the checked-out one, or the configured default when git
/// could not say. A detached HEAD has nothing to push by name.
pub fn push_branch<'a>(checked_out: &'a CheckedOut, default_branch: &'a str) -> Option<&'a str> {
    match checked_out {
        CheckedOut::Branch(name) => Some(name),
        CheckedOut::Unknown => Some(default_branch),
        CheckedOut::Detached => None,
    }
}
