//! Commit and push the project this binary is installed in.
//!
//! The binary lives in `<root>/<dir>/` and backs up `<root>`, reading
//! `<root>/.github_config.toml`. It takes no arguments.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backup::backup::{BackupOutcome, backup_project};
use backup::error::BackupError;
use backup::exit_codes;
use backup::io::config::{CONFIG_FILE_NAME, project_root_for};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "backup",
    version,
    about = "Commit and push local changes to the configured GitHub repository"
)]
struct Cli {}

fn main() {
    backup::logging::init();
    let _cli = Cli::parse();

    let root = match locate_project_root() {
        Ok(root) => root,
        Err(err) => {
            eprintln!("Error: cannot locate project root: {err:#}");
            std::process::exit(exit_codes::CONFIG);
        }
    };
    let config_path = root.join(CONFIG_FILE_NAME);
    println!("Project root: {}", root.display());
    println!("Config file: {}", config_path.display());

    let code = match backup_project(&root) {
        Ok(BackupOutcome::NoChanges | BackupOutcome::Published { .. }) => exit_codes::OK,
        Err(err) => {
            report_failure(&err, &config_path);
            err.exit_code()
        }
    };
    std::process::exit(code);
}

fn locate_project_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("resolve executable path")?;
    let exe = exe
        .canonicalize()
        .with_context(|| format!("canonicalize {}", exe.display()))?;
    project_root_for(&exe)
}

fn report_failure(err: &BackupError, config_path: &Path) {
    eprintln!("Error: {err}");
    match err {
        BackupError::Config(_) => {
            eprintln!("Please create {} with the required settings.", config_path.display());
        }
        BackupError::Push {
            remote,
            branch,
            commit,
            ..
        } => {
            eprintln!("Warning: commit {commit} was created locally, but the push failed.");
            eprintln!("Push manually with: git push -u {remote} {branch}");
            eprintln!();
            eprintln!("Possible causes:");
            eprintln!("1. SSH or credential authentication is not set up");
            eprintln!("2. The repository does not exist on GitHub");
            eprintln!("3. No permission to push to the repository");
        }
        BackupError::DetachedHead { commit } => {
            eprintln!("Warning: commit {commit} was created locally on a detached HEAD.");
            eprintln!("Check out a branch that contains it, then push manually, e.g.:");
            eprintln!("  git switch -c <branch> {commit} && git push -u <remote> <branch>");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_without_arguments() {
        assert!(Cli::try_parse_from(["backup"]).is_ok());
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(Cli::try_parse_from(["backup", "--force"]).is_err());
    }
}
