//! CLI integration tests for oneapi-migrate.
//!
//! These tests verify argument parsing, help output and exit codes for
//! configuration and connection errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the oneapi-migrate binary with DSN variables cleared.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("oneapi-migrate").unwrap();
    cmd.env_remove("ONEAPI_SOURCE_SQL_DSN")
        .env_remove("ONEAPI_TARGET_SQL_DSN")
        .env_remove("ONEAPI_REBUILD_ABILITIES");
    cmd
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_lists_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[SOURCE]"))
        .stdout(predicate::str::contains("[TARGET]"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--tables"))
        .stdout(predicate::str::contains("--skip-abilities"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_help_shows_env_fallbacks() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ONEAPI_SOURCE_SQL_DSN"))
        .stdout(predicate::str::contains("ONEAPI_TARGET_SQL_DSN"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("oneapi-migrate"));
}

#[test]
fn test_log_flags_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_dsns_fail() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("source DSN is required"));
}

#[test]
fn test_missing_target_dsn_fails() {
    cmd()
        .arg("./one-hub.db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("target DSN is required"));
}

#[test]
fn test_source_from_env() {
    cmd()
        .env("ONEAPI_SOURCE_SQL_DSN", "./one-hub.db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("target DSN is required"));
}

#[test]
fn test_same_database_rejected() {
    cmd()
        .args(["./one-api.db", "./one-api.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be the same"));
}

#[test]
fn test_nonexistent_sqlite_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("missing-source.db");
    let target = dir.path().join("missing-target.db");

    cmd()
        .args([source.to_str().unwrap(), target.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connection error"));

    assert!(!source.exists());
}

#[test]
fn test_invalid_yaml_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YAML error"));
}

#[test]
fn test_missing_config_file_fails() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_unknown_type_in_config_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  dsn: a.db").unwrap();
    writeln!(file, "  type: mssql").unwrap();
    writeln!(file, "target:").unwrap();
    writeln!(file, "  dsn: b.db").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source.type"));
}
