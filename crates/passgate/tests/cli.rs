//! Tests for the passgate command line surface

use std::process::Command;

const CHECKSUM_ENV: &str = "PASSGATE_UNCLIP_CHECKSUM";

fn passgate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_passgate"))
}

#[test]
fn test_help_lists_commands() {
    let output = passgate()
        .arg("--help")
        .output()
        .expect("Failed to execute passgate command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for expected in ["Usage:", "copy", "confirm", "select-key", "--no-confirm"] {
        assert!(
            stdout.contains(expected),
            "Output should contain '{}': {}",
            expected,
            stdout
        );
    }
    assert!(
        !stdout.contains("unclip"),
        "Watcher subcommand should be hidden: {}",
        stdout
    );
}

#[test]
fn test_version_flag() {
    let output = passgate()
        .arg("--version")
        .output()
        .expect("Failed to execute passgate command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "Output should contain the crate version: {}",
        stdout
    );
}

#[test]
fn test_unclip_without_checksum_fails() {
    let output = passgate()
        .args(["unclip", "--timeout", "0"])
        .env_remove(CHECKSUM_ENV)
        .output()
        .expect("Failed to execute passgate command");

    assert!(!output.status.success(), "Command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(CHECKSUM_ENV),
        "Error should name the missing variable: {}",
        stderr
    );
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let output = passgate()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["ask", "Proceed?"])
        .output()
        .expect("Failed to execute passgate command");

    assert!(!output.status.success(), "Command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to load configuration"),
        "Error should mention the configuration: {}",
        stderr
    );
}

#[test]
fn test_copy_help_mentions_clipboard_manager() {
    let output = passgate()
        .args(["copy", "--help"])
        .output()
        .expect("Failed to execute passgate command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("clipboard manager"),
        "Help should explain the X11 clipboard ownership: {}",
        stdout
    );
}
