// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the congruence CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Path to the shared fixture bundle
fn fixture() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/team.json")
        .display()
        .to_string()
}

/// congruence with an isolated data directory and no colour
fn congruence(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("congruence").unwrap();
    cmd.env("CONGRUENCE_DATA_DIR", data_dir.path())
        .env_remove("CONGRUENCE_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--no-color")
        .arg("--quiet");
    cmd
}

#[test]
fn test_analyze_prints_stc_value() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["analyze", &fixture()])
        .assert()
        .success()
        .stdout(predicate::str::contains("STC value:      0.7500 (good)"))
        .stdout(predicate::str::contains("MC-STC:         0.8000 (excellent)"));
}

#[test]
fn test_analyze_json_output() {
    let data_dir = TempDir::new().unwrap();
    let output = congruence(&data_dir)
        .args(["--json", "analyze", &fixture()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let run: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(run["status"]["state"], "completed");
    assert_eq!(run["status"]["result"]["missed_coordination_count"], 1);
    assert_eq!(run["status"]["result"]["health"], "good");
}

#[test]
fn test_iterations_below_minimum_rejected() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["analyze", &fixture(), "--monte-carlo", "--iterations", "50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 100"));
}

#[test]
fn test_pairs_filters() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["pairs", &fixture(), "--status", "missed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("security:carol"))
        .stdout(predicate::str::contains("security:erin"))
        .stdout(predicate::str::contains("alice").not());

    congruence(&data_dir)
        .args(["pairs", &fixture(), "--role", "ops", "--inter-class-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ops:dave"));
}

#[test]
fn test_export_dot() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["export", &fixture(), "--graph", "actual", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph actual {"))
        .stdout(predicate::str::contains("\"alice\" -- \"bob\""));
}

#[test]
fn test_export_json_inferred_from_extension() {
    let data_dir = TempDir::new().unwrap();
    let out = data_dir.path().join("requirement.json");
    congruence(&data_dir)
        .args(["export", &fixture(), "--output"])
        .arg(&out)
        .assert()
        .success();

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(exported["graph"], "requirement");
    assert_eq!(exported["nodes"].as_array().unwrap().len(), 5);
}

#[test]
fn test_run_lifecycle() {
    let data_dir = TempDir::new().unwrap();

    let output = congruence(&data_dir)
        .args(["--json", "run", "create", &fixture()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let created: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(created["status"]["state"], "created");
    let id = created["id"].as_str().unwrap().to_string();

    congruence(&data_dir)
        .args(["run", "start", &id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("STC value:      0.7500"));

    congruence(&data_dir)
        .args(["run", "start", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already completed"));

    congruence(&data_dir)
        .args(["run", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("completed"));
}

#[test]
fn test_contributors_comparison() {
    let data_dir = TempDir::new().unwrap();
    let output = congruence(&data_dir)
        .args(["--json", "contributors", &fixture(), "--role", "security"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["role"] == "security"));

    congruence(&data_dir)
        .args(["contributors", &fixture(), "--top", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("carol").not());
}

#[test]
fn test_run_stats() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["run", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No analysis runs yet."));

    congruence(&data_dir)
        .args(["analyze", &fixture(), "--save"])
        .assert()
        .success();

    let output = congruence(&data_dir)
        .args(["--json", "run", "stats", "--project", "payments"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats[0]["total_analyses"], 1);
    assert_eq!(stats[0]["completed_analyses"], 1);
    assert_eq!(stats[0]["health"], "excellent");
}

#[test]
fn test_invalid_bundle_rejected_at_create() {
    let data_dir = TempDir::new().unwrap();
    let bundle = data_dir.path().join("bad.json");
    std::fs::write(
        &bundle,
        r#"{"project": "bad", "contributors": ["a", "b"], "files": ["f"], "matrix": [[1], [-2]]}"#,
    )
    .unwrap();

    congruence(&data_dir)
        .args(["run", "create"])
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative"));

    congruence(&data_dir)
        .args(["run", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No analysis runs yet."));
}

#[test]
fn test_unknown_run() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["run", "status", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_show_reflects_environment() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .env("CONGRUENCE_ENGINE__EXACT_THRESHOLD", "42")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exact_threshold = 42"));
}

#[test]
fn test_completions() {
    let data_dir = TempDir::new().unwrap();
    congruence(&data_dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("congruence"));
}
