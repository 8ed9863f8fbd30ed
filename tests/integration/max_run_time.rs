#[path = "common/mod.rs"]
mod common;

use std::time::{Duration, Instant};

/// Scenario 4: `max_run_time` expiring must trigger shutdown on its own,
/// with no stop-signal file and no service exiting naturally.
#[test]
fn max_run_time_triggers_shutdown() {
    let run_dir = tempfile::tempdir().unwrap();

    let config = r#"
services:
  long_runner:
    command: "sleep 60"
max_run_time: 1
process_timeout: 1
"#;
    common::write_file(run_dir.path(), "workflow.yaml", config);
    let config_path = run_dir.path().join("workflow.yaml");

    let started = Instant::now();
    common::run_shepherd(run_dir.path(), &config_path).success();
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(6),
        "shutdown should complete shortly after max_run_time elapses, took {elapsed:?}"
    );

    let report = common::read_state_times(run_dir.path());
    assert!(report["long_runner"].get("stopped").is_some());
}
