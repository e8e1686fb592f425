//! End-to-end backup runs against real git and a local bare remote.
//!
//! Each test builds a throwaway project directory with `.github_config.toml`
//! and drives `backup_project` the way the binary does.

use backup::backup::{BackupOutcome, backup_project};
use backup::error::BackupError;
use backup::exit_codes;
use backup::io::config::BackupConfig;
use backup::test_support::{BareRemote, TestRepo, git_in};
use regex::Regex;

fn config_for(remote: &BareRemote) -> BackupConfig {
    BackupConfig {
        repository_url: Some(remote.url()),
        git_user_name: Some("Backup Bot".to_string()),
        git_user_email: Some("backup@example.com".to_string()),
        ..BackupConfig::default()
    }
}

fn expect_published(outcome: BackupOutcome) -> (String, String) {
    match outcome {
        BackupOutcome::Published { commit, branch } => (commit, branch),
        BackupOutcome::NoChanges => panic!("expected a published backup, got NoChanges"),
    }
}

/// Fresh directory → init, identity, remote, commit, push; rerun is a no-op.
#[test]
fn first_run_publishes_and_second_run_is_noop() {
    let project = TestRepo::uninitialized().expect("project");
    let remote = BareRemote::new().expect("remote");
    project.write_config(&config_for(&remote)).expect("config");
    project.write_file("site/index.html", "<h1>hello</h1>\n").expect("write");

    let (commit, branch) = expect_published(backup_project(project.root()).expect("first run"));

    assert!(project.root().join(".git").exists());
    assert_eq!(
        git_in(project.root(), &["remote", "get-url", "origin"]).expect("remote url"),
        remote.url()
    );
    assert_eq!(remote.branch_head(&branch).expect("remote head"), commit);

    let pattern = Regex::new(r"^Backup: \d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("regex");
    let message = project.last_message().expect("message");
    assert!(pattern.is_match(&message), "unexpected message: {message}");
    assert_eq!(
        git_in(project.root(), &["log", "-1", "--pretty=%an <%ae>"]).expect("author"),
        "Backup Bot <backup@example.com>"
    );

    let second = backup_project(project.root()).expect("second run");
    assert_eq!(second, BackupOutcome::NoChanges);
    assert_eq!(project.commit_count().expect("count"), 1);
}

#[test]
fn existing_repository_gets_remote_url_updated() {
    let project = TestRepo::new().expect("project");
    let remote = BareRemote::new().expect("remote");
    project.write_file("notes.md", "draft\n").expect("write");
    project.commit_all("initial").expect("commit");
    git_in(
        project.root(),
        &["remote", "add", "origin", "https://example.invalid/old.git"],
    )
    .expect("add stale remote");

    project.write_config(&config_for(&remote)).expect("config");
    project.write_file("notes.md", "final\n").expect("modify");

    let (commit, branch) = expect_published(backup_project(project.root()).expect("run"));

    assert_eq!(
        git_in(project.root(), &["remote", "get-url", "origin"]).expect("remote url"),
        remote.url()
    );
    assert_eq!(remote.branch_head(&branch).expect("remote head"), commit);
    assert_eq!(project.commit_count().expect("count"), 2);
}

#[test]
fn ignored_files_are_not_committed() {
    let project = TestRepo::new().expect("project");
    let remote = BareRemote::new().expect("remote");
    project.write_config(&config_for(&remote)).expect("config");
    project.write_file(".gitignore", "secrets.env\n").expect("write");
    project.write_file("secrets.env", "TOKEN=x\n").expect("write");
    project.write_file("app.js", "console.log(1);\n").expect("write");

    expect_published(backup_project(project.root()).expect("run"));

    let tracked = git_in(project.root(), &["ls-files"]).expect("ls-files");
    assert!(tracked.lines().any(|line| line == "app.js"));
    assert!(!tracked.lines().any(|line| line == "secrets.env"));
}

#[test]
fn missing_config_leaves_directory_untouched() {
    let project = TestRepo::uninitialized().expect("project");
    project.write_file("index.html", "<p>x</p>\n").expect("write");

    let err = backup_project(project.root()).unwrap_err();

    assert_eq!(err.exit_code(), exit_codes::CONFIG);
    assert!(!project.root().join(".git").exists());
}

#[test]
fn missing_repository_url_without_remote_fails_with_remote_code() {
    let project = TestRepo::new().expect("project");
    project
        .write_config(&BackupConfig::default())
        .expect("config");
    project.write_file("index.html", "<p>x</p>\n").expect("write");

    let err = backup_project(project.root()).unwrap_err();

    assert!(matches!(err, BackupError::MissingRepositoryUrl));
    assert_eq!(err.exit_code(), exit_codes::REMOTE);
    assert!(
        git_in(project.root(), &["rev-parse", "--verify", "HEAD"]).is_err(),
        "no commit should have been created"
    );
}

/// Push to a remote path that does not exist: exit code 6, commit stays local.
#[test]
fn push_failure_keeps_local_commit() {
    let project = TestRepo::new().expect("project");
    let parent = tempfile::tempdir().expect("tempdir");
    let missing = parent.path().join("gone.git");
    project
        .write_config(&BackupConfig {
            repository_url: Some(missing.display().to_string()),
            ..BackupConfig::default()
        })
        .expect("config");
    project.write_file("index.html", "<p>x</p>\n").expect("write");

    let err = backup_project(project.root()).unwrap_err();

    assert_eq!(err.exit_code(), exit_codes::PUSH);
    let BackupError::Push { commit, .. } = &err else {
        panic!("expected push error, got {err:?}");
    };
    assert_eq!(
        &git_in(project.root(), &["rev-parse", "HEAD"]).expect("head"),
        commit
    );
    assert_eq!(project.commit_count().expect("count"), 1);
}

/// A repository created on `master` is renamed and published as `main`.
#[test]
fn master_repository_is_published_as_main() {
    let project = TestRepo::with_initial_branch("master").expect("project");
    let remote = BareRemote::new().expect("remote");
    project.write_config(&config_for(&remote)).expect("config");
    project.write_file("index.html", "<p>x</p>\n").expect("write");

    let (commit, branch) = expect_published(backup_project(project.root()).expect("run"));

    assert_eq!(branch, "main");
    assert_eq!(
        git_in(project.root(), &["branch", "--show-current"]).expect("branch"),
        "main"
    );
    assert_eq!(remote.branch_head("main").expect("remote head"), commit);
    assert!(remote.branch_head("master").is_err());
}

/// A commit made on a detached HEAD fails with the push code and never
/// moves the remote branch.
#[test]
fn detached_head_commit_is_reported_not_pushed() {
    let project = TestRepo::with_initial_branch("main").expect("project");
    let remote = BareRemote::new().expect("remote");
    project.write_config(&config_for(&remote)).expect("config");
    project.write_file("index.html", "<p>v1</p>\n").expect("write");
    let (published, _) = expect_published(backup_project(project.root()).expect("first run"));

    git_in(project.root(), &["checkout", "--detach"]).expect("detach");
    project.write_file("index.html", "<p>v2</p>\n").expect("modify");

    let err = backup_project(project.root()).unwrap_err();

    assert_eq!(err.exit_code(), exit_codes::PUSH);
    let BackupError::DetachedHead { commit } = &err else {
        panic!("expected detached head error, got {err:?}");
    };
    assert_eq!(
        &git_in(project.root(), &["rev-parse", "HEAD"]).expect("head"),
        commit
    );
    assert_ne!(commit, &published);
    assert_eq!(remote.branch_head("main").expect("remote head"), published);
}
