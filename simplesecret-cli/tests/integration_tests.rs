//! Integration tests for simplesecret-cli
//!
//! These tests run the binary end-to-end for everything that is decided
//! before the session bus is contacted: argument parsing, help output,
//! generated artifacts, settings errors and their exit codes.

#![allow(clippy::uninlined_format_args)]

use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run the CLI with given arguments
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_simplesecret"))
        .env_remove("SIMPLESECRET_COLLECTION")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

/// Helper to get stdout as string
fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Helper to get stderr as string
fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ============================================================================
// Help Command Tests
// ============================================================================

#[test]
fn test_help_command() {
    let output = run_cli(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = stdout_str(&output);
    assert!(
        stdout.contains("simplesecret"),
        "Help should mention program name"
    );
    for command in [
        "status",
        "store",
        "get",
        "search",
        "show",
        "list",
        "dump",
        "delete",
        "lock",
        "drop-collection",
    ] {
        assert!(
            stdout.contains(command),
            "Help should mention {} command",
            command
        );
    }
}

#[test]
fn test_store_help() {
    let output = run_cli(&["store", "--help"]);

    assert!(output.status.success(), "Store help should succeed");

    let stdout = stdout_str(&output);
    assert!(stdout.contains("--attr"), "Store help should mention --attr");
    assert!(
        stdout.contains("--password-stdin"),
        "Store help should mention --password-stdin"
    );
    assert!(
        stdout.contains("--collection"),
        "Global options should be listed on subcommands"
    );
}

#[test]
fn test_version() {
    let output = run_cli(&["--version"]);

    assert!(output.status.success());
    assert!(stdout_str(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Generated Artifacts
// ============================================================================

#[test]
fn test_bash_completions() {
    let output = run_cli(&["completions", "bash"]);

    assert!(output.status.success(), "Completions should succeed");
    assert!(stdout_str(&output).contains("simplesecret"));
}

#[test]
fn test_manpage() {
    let output = run_cli(&["manpage"]);

    assert!(output.status.success(), "Man page should succeed");
    let stdout = stdout_str(&output);
    assert!(stdout.contains(".TH"), "Man page should be roff");
    assert!(stdout.contains("simplesecret"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_unknown_command() {
    let output = run_cli(&["frobnicate"]);

    assert!(!output.status.success());
    assert!(stderr_str(&output).contains("frobnicate"));
}

#[test]
fn test_search_without_attributes() {
    let output = run_cli(&["search"]);

    assert!(!output.status.success(), "Search needs attributes");
}

#[test]
fn test_malformed_attribute() {
    let output = run_cli(&["search", "novalue"]);

    assert!(!output.status.success());
    assert!(
        stderr_str(&output).contains("KEY=value"),
        "Should explain the expected format: {}",
        stderr_str(&output)
    );
}

#[test]
fn test_invalid_settings_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = temp_dir.path().join("client.toml");
    std::fs::write(&config, "prompt_timeout = [not toml").expect("Failed to write config");

    let output = run_cli(&["--config", config.to_str().unwrap(), "list"]);

    assert_eq!(output.status.code(), Some(1), "Bad settings are a general error");
    assert!(stderr_str(&output).contains("Configuration error"));
}

#[test]
fn test_missing_settings_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = temp_dir.path().join("absent.toml");

    let output = run_cli(&["-c", config.to_str().unwrap(), "status"]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_zero_timeout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = temp_dir.path().join("client.toml");
    std::fs::write(&config, "").expect("Failed to write config");

    let output = run_cli(&["--config", config.to_str().unwrap(), "--timeout", "0", "lock"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("--timeout"));
}

#[test]
fn test_drop_collection_needs_label() {
    let output = run_cli(&["drop-collection"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("--collection"));
}

#[test]
fn test_quiet_suppresses_error_message() {
    let output = run_cli(&["--quiet", "drop-collection"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).is_empty());
}
