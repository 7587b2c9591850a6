//! CLI integration tests for the Patrol command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Commands that need no server behave offline
//!
//! Every command runs with its config, data and session files redirected
//! into a temporary directory.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the patrol binary, isolated in `home`.
fn patrol(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("patrol").unwrap();
    cmd.current_dir(home)
        .env("PATROL_CONFIG_DIR", home.join("config"))
        .env("PATROL_SESSION_ID", "cli-test")
        .env("TMPDIR", home.join("tmp"))
        .env_remove("PATROL_SERVER_URL");
    cmd
}

/// A temp home whose user config points the durable tier inside it.
fn home() -> TempDir {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::create_dir_all(temp.path().join("tmp")).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "[storage]\ndata_dir = {:?}\n",
            temp.path().join("data").display().to_string()
        ),
    )
    .unwrap();
    temp
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = home();
    patrol(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Patrol"));
}

#[test]
fn test_version_displays() {
    let home = home();
    patrol(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("patrol"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = home();
    patrol(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("passwd"))
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("users"))
        .stdout(predicate::str::contains("config"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag_accepted() {
    let home = home();
    patrol(home.path())
        .args(["--verbose", "--help"])
        .assert()
        .success();
}

#[test]
fn test_json_flag_accepted() {
    let home = home();
    patrol(home.path()).args(["--json", "--help"]).assert().success();
}

#[test]
fn test_server_flag_accepted() {
    let home = home();
    patrol(home.path())
        .args(["--server", "http://localhost:9999/api", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommand Help Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_login_help() {
    let home = home();
    patrol(home.path())
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--remember"));
}

#[test]
fn test_register_help() {
    let home = home();
    patrol(home.path())
        .args(["register", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--email"))
        .stdout(predicate::str::contains("--organization"));
}

#[test]
fn test_profile_help() {
    let home = home();
    patrol(home.path())
        .args(["profile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("update"));
}

#[test]
fn test_users_help() {
    let home = home();
    patrol(home.path())
        .args(["users", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("delete"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalid Input Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_subcommand_fails() {
    let home = home();
    patrol(home.path())
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_flag_fails() {
    let home = home();
    patrol(home.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_role_rejected() {
    let home = home();
    patrol(home.path())
        .args(["users", "create", "bob", "--email", "b@example.com", "--role", "owner"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_user_id_must_be_numeric() {
    let home = home();
    patrol(home.path())
        .args(["users", "show", "abc"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Behavior
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_without_credentials_is_signed_out() {
    let home = home();
    // Nothing listens here; a request would fail the command.
    patrol(home.path())
        .args(["--json", "--server", "http://127.0.0.1:9/api", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\": false"));
}

#[test]
fn test_logout_without_session_succeeds() {
    let home = home();
    patrol(home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out."));
}

#[test]
fn test_logout_with_truncated_credential_file() {
    let home = home();
    let data = home.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("credentials.json"), r#"{"refresh_token": "R"#).unwrap();

    patrol(home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out."));

    let saved = std::fs::read_to_string(data.join("credentials.json")).unwrap();
    assert!(!saved.contains("refresh_token"));
}

#[test]
fn test_profile_requires_sign_in() {
    let home = home();
    patrol(home.path())
        .args(["--server", "http://127.0.0.1:9/api", "profile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn test_set_server_then_show() {
    let home = home();
    patrol(home.path())
        .args(["config", "set-server", "https://patrol.example.com/api"])
        .assert()
        .success();

    patrol(home.path())
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://patrol.example.com/api"));

    // Storage settings in the same file survive the rewrite.
    let saved = std::fs::read_to_string(home.path().join("config/config.toml")).unwrap();
    assert!(saved.contains("data_dir"));
}

#[test]
fn test_server_flag_overrides_config() {
    let home = home();
    patrol(home.path())
        .args(["--json", "--server", "http://override.test/api", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://override.test/api"));
}

#[test]
fn test_set_server_rejects_invalid_url() {
    let home = home();
    patrol(home.path())
        .args(["config", "set-server", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid server URL"));
}
