#[path = "common/mod.rs"]
mod common;

use std::time::Duration;

/// Scenario 3: a long-running service plus a stop-signal file. Dropping
/// the stop file mid-run must trigger shutdown within a couple of
/// seconds, and the file must be removed once shutdown completes.
#[test]
fn stop_signal_file_triggers_shutdown() {
    let run_dir = tempfile::tempdir().unwrap();

    let config = r#"
services:
  long_runner:
    command: "sleep 60"
stop_signal: "stop.txt"
process_timeout: 1
"#;
    common::write_file(run_dir.path(), "workflow.yaml", config);
    let config_path = run_dir.path().join("workflow.yaml");

    let run_dir_path = run_dir.path().to_path_buf();
    let config_path_clone = config_path.clone();
    let handle = std::thread::spawn(move || {
        common::run_shepherd(&run_dir_path, &config_path_clone).success();
    });

    std::thread::sleep(Duration::from_millis(300));
    let control_dir = run_dir.path().join("control");
    std::fs::create_dir_all(&control_dir).unwrap();
    common::write_file(&control_dir, "stop.txt", "");

    handle.join().expect("shepherd process should exit cleanly");

    assert!(!control_dir.join("stop.txt").exists());

    let report = common::read_state_times(run_dir.path());
    assert!(report["long_runner"].get("stopped").is_some());
    assert!(report["long_runner"].get("final").is_some());
}
