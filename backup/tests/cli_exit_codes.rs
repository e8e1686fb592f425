//! CLI tests for the `backup` binary.
//!
//! The binary resolves its project root from its own location, so inside the
//! cargo target directory there is no configuration to find.

use std::process::Command;

use backup::exit_codes;

#[test]
fn missing_config_exits_with_config_code() {
    let output = Command::new(env!("CARGO_BIN_EXE_backup"))
        .output()
        .expect("run backup");

    assert_eq!(output.status.code(), Some(exit_codes::CONFIG));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Config file:"), "stdout: {stdout}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Please create"), "stderr: {stderr}");
}

#[test]
fn version_flag_succeeds() {
    let status = Command::new(env!("CARGO_BIN_EXE_backup"))
        .arg("--version")
        .status()
        .expect("run backup --version");

    assert_eq!(status.code(), Some(exit_codes::OK));
}
