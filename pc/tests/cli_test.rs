//! CLI tests for the pcal binary

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_config(dir: &Path) -> PathBuf {
    let mapping = dir.join("strategy_mapping.json");
    let config = dir.join("promptcal.yml");
    fs::write(
        &config,
        format!(
            r#"
storage:
  mapping-path: {}
servers:
  filesystem:
    command: npx
    args: ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
  github:
    command: github-mcp-server
    tools:
      - name: search_repositories
        params:
          query: rust
"#,
            mapping.display()
        ),
    )
    .unwrap();
    config
}

fn pcal() -> Command {
    let mut cmd = Command::cargo_bin("pcal").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_strategies_lists_registration_order() {
    pcal()
        .arg("strategies")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. imperative"))
        .stdout(predicate::str::contains("fallback"))
        .stdout(predicate::str::contains("5. explicitTypes"));
}

#[test]
fn test_servers_lists_configured_servers() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    pcal()
        .arg("--config")
        .arg(&config)
        .arg("servers")
        .assert()
        .success()
        .stdout(predicate::str::contains("filesystem"))
        .stdout(predicate::str::contains("github"))
        .stdout(predicate::str::contains("1 static tools"));
}

#[test]
fn test_calibrate_unknown_server_lists_known() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    pcal()
        .arg("--config")
        .arg(&config)
        .args(["calibrate", "tavily"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown server 'tavily'"))
        .stderr(predicate::str::contains("filesystem, github"));
}

#[test]
fn test_show_without_mapping() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    pcal()
        .arg("--config")
        .arg(&config)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("No calibrations saved"));
}

#[test]
fn test_show_and_prompt_use_saved_mapping() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    fs::write(
        dir.path().join("strategy_mapping.json"),
        r#"{"filesystem":{"last_calibrated":"2026-10-19T08:00:00Z","tools":{"list_allowed_directories":"stepByStep"}}}"#,
    )
    .unwrap();

    pcal()
        .arg("--config")
        .arg(&config)
        .args(["show", "filesystem"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list_allowed_directories"))
        .stdout(predicate::str::contains("stepByStep"));

    pcal()
        .arg("--config")
        .arg(&config)
        .args(["prompt", "filesystem", "list_allowed_directories"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stepByStep (calibrated)"))
        .stdout(predicate::str::contains("1. Select the `list_allowed_directories` tool."));
}

#[test]
fn test_prompt_falls_back_for_uncalibrated_tool() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    pcal()
        .arg("--config")
        .arg(&config)
        .args(["prompt", "filesystem", "read_file", "--params", r#"{"path":"/tmp/a.txt"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("imperative (fallback)"))
        .stdout(predicate::str::contains("path=/tmp/a.txt"));
}

#[test]
fn test_prompt_rejects_non_object_params() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    pcal()
        .arg("--config")
        .arg(&config)
        .args(["prompt", "filesystem", "read_file", "--params", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[test]
fn test_calibrate_all_with_no_reachable_server_saves_nothing() {
    let dir = TempDir::new().unwrap();
    let mapping = dir.path().join("strategy_mapping.json");
    let config = dir.path().join("promptcal.yml");
    fs::write(
        &config,
        format!(
            r#"
llm:
  api-key-env: PCAL_CLI_TEST_KEY
calibration:
  server-pause-ms: 0
storage:
  mapping-path: {}
servers:
  ghost:
    command: pcal-test-no-such-server
"#,
            mapping.display()
        ),
    )
    .unwrap();

    pcal()
        .env("PCAL_CLI_TEST_KEY", "unused")
        .arg("--config")
        .arg(&config)
        .args(["calibrate", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 server(s) could not be calibrated"))
        .stdout(predicate::str::contains("No server calibrated: mapping not saved"))
        .stdout(predicate::str::contains("Mapping saved").not());

    assert!(!mapping.exists());
}
