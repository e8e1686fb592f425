//! Scheduled or on-demand backup of a project directory to a GitHub remote.
//!
//! A run initializes the repository if needed, points the remote at the
//! configured URL, and when the working tree has changes, stages everything,
//! commits it with a timestamped message and pushes it.
//!
//! - **[`core`]**: Pure decisions (commit message, branch and retry rules).
//! - **[`io`]**: Config file, git subprocesses and the process runner.
//!
//! The step modules ([`setup`], [`snapshot`], [`publish`]) are sequenced by
//! [`backup`], which maps the first failure to a [`BackupError`] and its exit
//! code.

pub mod backup;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod publish;
pub mod setup;
pub mod snapshot;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::BackupError;
