#[path = "common/mod.rs"]
mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_run_dir_is_a_fatal_error() {
    let run_dir = tempfile::tempdir().unwrap();
    let config_path = run_dir.path().join("workflow.yaml");
    common::write_file(run_dir.path(), "workflow.yaml", "services: {}\n");

    Command::cargo_bin("shepherd")
        .unwrap()
        .arg("--run-dir")
        .arg(run_dir.path().join("does-not-exist"))
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("run directory"));
}

#[test]
fn missing_config_file_is_a_fatal_error() {
    let run_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("shepherd")
        .unwrap()
        .arg("--run-dir")
        .arg(run_dir.path())
        .arg("--config")
        .arg(run_dir.path().join("nope.yaml"))
        .assert()
        .failure();
}

#[test]
fn empty_workflow_completes_immediately() {
    let run_dir = tempfile::tempdir().unwrap();
    common::write_file(run_dir.path(), "workflow.yaml", "services: {}\n");
    let config_path = run_dir.path().join("workflow.yaml");

    common::run_shepherd(run_dir.path(), &config_path).success();
    assert!(run_dir.path().join("state_times.json").exists());
}
