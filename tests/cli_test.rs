//! Smoke tests for the `stackctl` binary.
//!
//! Every config here reserves ports nothing listens on and declares no
//! containers, so the commands never touch real processes.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn stackctl_binary() -> String {
    env!("CARGO_BIN_EXE_stackctl").to_string()
}

/// Two distinct ports that were free a moment ago.
fn free_ports() -> (u16, u16) {
    let a = std::net::TcpListener::bind("127.0.0.1:0").expect("Bind to get free port");
    let b = std::net::TcpListener::bind("127.0.0.1:0").expect("Bind to get free port");
    (a.local_addr().unwrap().port(), b.local_addr().unwrap().port())
}

fn write_config(temp_dir: &TempDir, body: &str) -> String {
    let config_path = temp_dir.path().join("stack.yaml");
    fs::write(&config_path, body).expect("Failed to write config");
    config_path.to_str().unwrap().to_string()
}

fn closed_stack(temp_dir: &TempDir) -> String {
    let (cache, dashboard) = free_ports();
    let config = format!(
        r#"
services:
  - name: cache
    port: {cache}
    tier: infra
  - name: dashboard
    port: {dashboard}
    tier: optional
orphans:
  signatures: ["stackctl-cli-test-signature-that-matches-nothing"]
health:
  timeout: 500ms
"#,
        cache = cache,
        dashboard = dashboard,
    );
    write_config(temp_dir, &config)
}

fn run(args: &[&str]) -> Output {
    Command::new(stackctl_binary())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run stackctl")
}

// ============================================================================
// Help and completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["stop", "verify", "start", "scan", "ports", "doctor"] {
        assert!(stdout.contains(command), "help is missing `{}`", command);
    }
}

#[test]
fn test_completions_generate() {
    let output = run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("stackctl"));
}

// ============================================================================
// Config errors
// ============================================================================

#[test]
fn test_missing_config_fails() {
    let output = run(&["-c", "/nonexistent/stack.yaml", "verify"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "got: {}", stderr);
}

#[test]
fn test_duplicate_ports_rejected_before_any_action() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
services:
  - { name: api, port: 18091, tier: required }
  - { name: worker, port: 18091, tier: optional }
"#,
    );

    let output = run(&["-c", &config_path, "stop"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("18091"), "got: {}", stderr);
    assert!(stderr.contains("Hint:"));
}

// ============================================================================
// verify / stop / ports
// ============================================================================

#[test]
fn test_verify_reports_infra_failure() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = closed_stack(&temp_dir);

    let output = run(&["-c", &config_path, "verify", "--include-optional"]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAIL [INFRA] cache ("), "got: {}", stdout);
    assert!(stdout.contains("SKIP [OPTIONAL] dashboard ("), "got: {}", stdout);
    assert!(stdout.contains("Result: 0 passed, 1 failed"));
}

#[test]
fn test_verify_json_is_parseable() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = closed_stack(&temp_dir);

    let output = run(&["-c", &config_path, "verify", "--json", "--timeout", "200ms"]);
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["fail_count"], 1);
    assert_eq!(report["results"][0]["label"], "cache");
}

#[test]
fn test_stop_on_stopped_stack_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = closed_stack(&temp_dir);

    let output = run(&["-c", &config_path, "stop"]);
    assert!(
        output.status.success(),
        "stop failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PASS [INFRA] cache (port"));
    assert!(stdout.contains("Result: 2 passed, 0 failed"));
}

#[test]
fn test_ports_json_lists_registry() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = closed_stack(&temp_dir);

    let output = run(&["-c", &config_path, "ports", "--json"]);
    assert!(output.status.success());

    let ports: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let ports = ports.as_array().unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0]["service"]["name"], "cache");
    assert_eq!(ports[0]["free"], true);
}
