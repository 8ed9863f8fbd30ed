#[path = "common/mod.rs"]
mod common;

use std::time::{Duration, Instant};

/// Scenario 5: a service that traps and ignores SIGTERM must be forced
/// down with SIGKILL once `process_timeout` elapses, and the run must
/// still complete (rather than hang forever).
#[test]
fn sigterm_trapping_service_is_escalated_to_sigkill() {
    let run_dir = tempfile::tempdir().unwrap();

    let config = r#"
services:
  stubborn:
    command: "trap '' TERM; sleep 60"
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

    let started = Instant::now();
    handle.join().expect("shepherd process should exit cleanly");
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(6),
        "SIGKILL escalation should bound shutdown time, took {elapsed:?}"
    );
}
