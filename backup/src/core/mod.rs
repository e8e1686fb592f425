//! Pure decision logic for backup runs.
//!
//! Nothing in here touches git or the filesystem.

pub mod message;
pub mod policy;
