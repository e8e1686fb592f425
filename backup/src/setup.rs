//! Repository preparation: init, identity, branch naming and remote.
//!
//! Each step is safe to run on every backup. Steps that find the repository
//! already in the desired state only re-assert it.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::policy::{CheckedOut, should_rename_to_main};
use crate::error::{BackupError, detail};
use crate::io::config::BackupConfig;
use crate::io::git::VersionControl;

/// Run `git init` if the repository is missing, then apply identity.
///
/// Identity failures are only warned about, since git falls back to the
/// global identity.
pub fn ensure_initialized<V: VersionControl>(
    vcs: &V,
    config: &BackupConfig,
) -> Result<(), BackupError> {
    if vcs.is_initialized() {
        debug!("repository already initialized");
        return Ok(());
    }

    println!("Git repository not initialized. Initializing...");
    vcs.init().map_err(|err| BackupError::Init(detail(&err)))?;
    println!("Git repository initialized.");
    info!("repository initialized");

    if let Err(err) = apply_identity(vcs, config) {
        warn!(err = %detail(&err), "identity configuration failed");
        eprintln!("Warning: could not configure git identity: {err:#}");
    }
    Ok(())
}

/// Set `user.name` / `user.email` from the config, skipping absent values.
pub fn apply_identity<V: VersionControl>(vcs: &V, config: &BackupConfig) -> Result<()> {
    if let Some(name) = config.git_user_name() {
        vcs.set_config("user.name", name)?;
    }
    if let Some(email) = config.git_user_email() {
        vcs.set_config("user.email", email)?;
    }
    Ok(())
}

/// Rename `master` to `main` when the config asks for `main`.
///
/// Returns what HEAD points at afterwards. A failed rename keeps the old
/// state; a detached HEAD is never renamed.
pub fn normalize_branch<V: VersionControl>(vcs: &V, config: &BackupConfig) -> CheckedOut {
    let checked_out = match vcs.current_branch() {
        Ok(Some(name)) => CheckedOut::Branch(name),
        Ok(None) => CheckedOut::Detached,
        Err(err) => {
            debug!(err = %detail(&err), "current branch unknown, assuming master");
            CheckedOut::Unknown
        }
    };

    let Some(current) = checked_out.rename_candidate() else {
        return checked_out;
    };
    if !should_rename_to_main(current, &config.default_branch) {
        return checked_out;
    }

    println!("Renaming branch 'master' to 'main'...");
    match vcs.rename_branch("main") {
        Ok(()) => CheckedOut::Branch("main".to_string()),
        Err(err) => {
            warn!(err = %detail(&err), "branch rename failed");
            eprintln!("Warning: could not rename branch 'master' to 'main': {err:#}");
            checked_out
        }
    }
}

/// Add the remote, or point an existing one at `repository_url`.
///
/// With no remote yet, a missing URL or a failing `remote add` is fatal. An
/// existing remote that cannot be updated is kept as is.
pub fn ensure_remote<V: VersionControl>(
    vcs: &V,
    config: &BackupConfig,
) -> Result<(), BackupError> {
    let remote = config.remote_name.as_str();
    let existing = vcs
        .remote_url(remote)
        .map_err(|err| BackupError::Remote(detail(&err)))?;

    match (existing, config.repository_url()) {
        (None, None) => {
            eprintln!("Error: repository_url not found in configuration.");
            Err(BackupError::MissingRepositoryUrl)
        }
        (None, Some(url)) => {
            println!("Remote repository not configured. Configuring...");
            vcs.add_remote(remote, url)
                .map_err(|err| BackupError::Remote(detail(&err)))?;
            println!("Remote repository added: {url}");
            Ok(())
        }
        (Some(current), None) => {
            warn!(remote, "repository_url missing, keeping existing remote");
            eprintln!("Warning: repository_url not found in configuration; keeping {current}");
            Ok(())
        }
        (Some(current), Some(url)) => {
            if let Err(err) = vcs.set_remote_url(remote, url) {
                warn!(remote, err = %detail(&err), "remote update failed");
                eprintln!("Warning: could not update remote URL, keeping {current}: {err:#}");
            } else {
                println!("Remote URL updated: {url}");
            }
            Ok(())
        }
    }
}
