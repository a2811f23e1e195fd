//! Integration tests for the `bodyctl` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! without a service; command tests run against a wiremock body controller.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `bodyctl` binary with env isolation.
///
/// Clears all `BODYCTL_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn bodyctl_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("bodyctl");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("BODYCTL_PROFILE")
        .env_remove("BODYCTL_ENDPOINT")
        .env_remove("BODYCTL_OUTPUT")
        .env_remove("BODYCTL_INSECURE")
        .env_remove("BODYCTL_TIMEOUT")
        // One attempt per request keeps failure tests fast.
        .env("BODYCTL_DEFAULTS__RETRIES", "1");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "message": "ok",
        "data": data,
        "timestamp": 1_700_000_000
    }))
}

fn api(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = bodyctl_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_device_commands() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("door")
            .and(predicate::str::contains("window"))
            .and(predicate::str::contains("light"))
            .and(predicate::str::contains("seat"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bodyctl"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = bodyctl_cmd(home.path()).arg("trunk").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("trunk"));
}

#[test]
fn test_window_position_out_of_range_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = bodyctl_cmd(home.path())
        .args(["window", "set", "fl", "150"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("150"));
}

#[test]
fn test_memory_preset_out_of_range_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["seat", "recall", "4"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_profile_is_not_found() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--profile", "garage", "health"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("garage"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_set_then_profiles_and_show() {
    let home = tempfile::tempdir().unwrap();

    bodyctl_cmd(home.path())
        .args(["--profile", "bench", "config", "set", "url", "http://10.0.0.7:8080/api"])
        .assert()
        .success();
    bodyctl_cmd(home.path())
        .args(["config", "use", "bench"])
        .assert()
        .success();

    bodyctl_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bench *"));
    bodyctl_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://10.0.0.7:8080/api"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["config", "set", "colour", "red"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_config_use_missing_profile() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["config", "use", "nowhere"])
        .assert()
        .code(4);
}

// ── Commands against a service ──────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_door_lock_sends_command() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/door/lock"))
        .and(body_json(json!({ "doorID": 0, "command": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Door 0 locked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "-o", "json", "door", "lock", "fl"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let outcome: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["ok"], json!(true));
    assert_eq!(outcome["target"], json!("door front-left"));
    assert_eq!(outcome["message"], json!("Door 0 locked"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_command_exits_with_rejected_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/light/headlight"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Ignition off"
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "light", "headlight", "low"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Ignition off"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlock_all_requires_confirmation_when_not_interactive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/door/lock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "door", "unlock", "all"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlock_all_reports_each_door() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/door/lock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(4)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "-y", "-o", "plain", "door", "unlock", "all"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    for door in ["front-left", "front-right", "rear-left", "rear-right"] {
        assert!(stdout.contains(&format!("door {door} ok")), "{stdout}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_window_status_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/window/\d/position$"))
        .respond_with(ok(json!({ "windowID": 2, "position": 35 })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "-o", "plain", "window", "status", "rl"])
        .assert()
        .success()
        .stdout("rear-left 35\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ok(json!({
            "status": "healthy",
            "uptime": 3723.5,
            "services": { "door": true, "window": true }
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "health"])
        .assert()
        .success()
        .stdout(predicate::str::contains("healthy").and(predicate::str::contains("1h 2m 3s")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_degraded_health_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ok(json!({ "status": "degraded" })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--endpoint", &api(&server), "-o", "plain", "health"])
        .assert()
        .code(1)
        .stdout("degraded\n");
}

#[test]
fn test_unreachable_service_is_connection_error() {
    let home = tempfile::tempdir().unwrap();
    bodyctl_cmd(home.path())
        .args(["--endpoint", "http://127.0.0.1:9/api", "info"])
        .assert()
        .code(7);
}
