//! I/O helpers for backup runs.

pub mod config;
pub mod git;
pub mod process;
