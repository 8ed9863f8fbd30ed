use std::path::Path;

use assert_cmd::Command;

/// Runs the shepherd binary against `config_path` with `run_dir` as both
/// the run directory and the working directory, and returns the finished
/// `assert_cmd::Command` assertion for the caller to inspect.
pub fn run_shepherd(run_dir: &Path, config_path: &Path) -> assert_cmd::assert::Assert {
    Command::cargo_bin("shepherd")
        .expect("shepherd binary should build")
        .arg("--run-dir")
        .arg(run_dir)
        .arg("--config")
        .arg(config_path)
        .arg("--work-dir")
        .arg(run_dir)
        .assert()
}

/// Reads and parses the state_times.json report written to `run_dir`.
pub fn read_state_times(run_dir: &Path) -> serde_json::Value {
    let path = run_dir.join("state_times.json");
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    serde_json::from_str(&contents).expect("state_times.json should be valid JSON")
}

/// Writes `contents` to `dir/name`.
pub fn write_file(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).expect("failed to write test fixture file");
}
