//! Integration tests for the `hassnotify` CLI binary.
//!
//! These tests cover argument parsing, completions, config inspection and
//! error exit codes, all without a live Home Assistant instance.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `hassnotify` binary with env isolation.
///
/// Clears known `HASSNOTIFY_*` variables and points config directories at
/// a nonexistent path so tests never touch the user's real configuration.
fn hassnotify_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hassnotify");
    cmd.env("HOME", "/tmp/hassnotify-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/hassnotify-cli-test-nonexistent")
        .env_remove("HASSNOTIFY_CONFIG")
        .env_remove("HASSNOTIFY_TOKEN")
        .env_remove("HASSNOTIFY_HASS__SERVER")
        .env_remove("HASSNOTIFY_HASS__TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const HOUSEHOLD: &str = r#"
[hass]
server = "ws://homeassistant.local:8123/api/websocket"
token = "super-secret-token"

[people."person.alice"]
name = "Alice"
notification_device = "alice_phone"

[people."person.bob"]
name = "Bob"
notification_device = "bob_phone"

[locations.home]
name = "Home"

[locations.work_bob]
name = "work"
owner = "person.bob"
owner_name = "Bob's"
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = hassnotify_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    hassnotify_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    hassnotify_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hassnotify"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    hassnotify_cmd().arg("frobnicate").assert().code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    hassnotify_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hassnotify"));
}

#[test]
fn test_completions_zsh() {
    hassnotify_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── config path ─────────────────────────────────────────────────────

#[test]
fn test_config_path_default() {
    hassnotify_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hassnotify").and(predicate::str::contains("config.toml")));
}

#[test]
fn test_config_path_honours_flag_and_env() {
    hassnotify_cmd()
        .args(["--config", "/srv/hassnotify.yaml", "config", "path"])
        .assert()
        .success()
        .stdout("/srv/hassnotify.yaml\n");

    hassnotify_cmd()
        .env("HASSNOTIFY_CONFIG", "/srv/from-env.toml")
        .args(["config", "path"])
        .assert()
        .success()
        .stdout("/srv/from-env.toml\n");
}

// ── config check ────────────────────────────────────────────────────

#[test]
fn test_config_check_prints_summary_without_token() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.toml", HOUSEHOLD);

    let output = hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ws://homeassistant.local:8123/api/websocket"), "{stdout}");
    assert!(stdout.contains("People:    2"), "{stdout}");
    assert!(stdout.contains("person.alice  Alice  -> alice_phone"), "{stdout}");
    assert!(stdout.contains("Bob's work"), "{stdout}");
    assert!(
        !combined_output(&output).contains("super-secret-token"),
        "token must never be printed"
    );
}

#[test]
fn test_config_check_reads_yaml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.yml",
        "hass:\n  server: ws://hass.local/api/websocket\n  token: t\n\
         people:\n  person.alice:\n    name: Alice\n",
    );

    hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("People:    1"));
}

#[test]
fn test_env_overrides_file_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.toml", HOUSEHOLD);

    hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .env("HASSNOTIFY_HASS__SERVER", "wss://override.example.com/api/websocket")
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wss://override.example.com/api/websocket"));
}

#[test]
fn test_token_from_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.toml",
        "[hass]\nserver = \"ws://hass.local/api/websocket\"\ntoken_env = \"MY_HASS_TOKEN\"\n",
    );

    hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .env("MY_HASS_TOKEN", "abc")
        .args(["config", "check"])
        .assert()
        .success();

    hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .env_remove("MY_HASS_TOKEN")
        .env("HASSNOTIFY_TOKEN", "abc")
        .args(["config", "check"])
        .assert()
        .success();
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_missing_token_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.toml",
        "[hass]\nserver = \"ws://hass.local/api/websocket\"\n",
    );

    let output = hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("access token"));
}

#[test]
fn test_missing_explicit_config_exits_with_config_code() {
    let output = hassnotify_cmd()
        .args(["--config", "/tmp/hassnotify-cli-test-nonexistent/nope.toml", "run"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("not found"));
}

#[test]
fn test_non_websocket_server_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.toml",
        "[hass]\nserver = \"http://hass.local:8123\"\ntoken = \"t\"\n",
    );

    let output = hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("hass.server"));
}

#[test]
fn test_unreachable_hub_exits_with_connection_code() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.toml",
        "[hass]\nserver = \"ws://127.0.0.1:1/api/websocket\"\ntoken = \"t\"\ntimeout_secs = 1\n",
    );

    let output = hassnotify_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "check", "--connect"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Could not reach Home Assistant"));
}
