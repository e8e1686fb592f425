//! Stable exit codes for the backup binary.

/// Backup pushed, or nothing to commit.
pub const OK: i32 = 0;
/// Configuration file missing or invalid.
pub const CONFIG: i32 = 1;
/// `git init` failed.
pub const INIT: i32 = 2;
/// Remote could not be added or updated (including a missing `repository_url`).
pub const REMOTE: i32 = 3;
/// Working tree could not be inspected or staged.
pub const STAGE: i32 = 4;
/// Commit could not be created or resolved.
pub const COMMIT: i32 = 5;
/// Push failed; the commit still exists locally.
pub const PUSH: i32 = 6;
