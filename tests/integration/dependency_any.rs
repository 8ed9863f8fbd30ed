#[path = "common/mod.rs"]
mod common;

/// Scenario 6: a service with `mode: any` on two dependencies must start
/// as soon as the faster of the two satisfies its required state,
/// without waiting for the slower one.
#[test]
fn any_mode_dependency_starts_on_first_satisfied() {
    let run_dir = tempfile::tempdir().unwrap();

    let config = r#"
services:
  fast:
    command: "echo fast"
    type: action
  slow:
    command: "sleep 5 && echo slow"
    type: action
  consumer:
    command: "echo consumer"
    type: action
    dependency:
      mode: any
      items:
        fast: action_success
        slow: action_success
max_run_time: 8
process_timeout: 1
"#;
    common::write_file(run_dir.path(), "workflow.yaml", config);
    let config_path = run_dir.path().join("workflow.yaml");

    common::run_shepherd(run_dir.path(), &config_path).success();

    let report = common::read_state_times(run_dir.path());
    let fast_done = report["fast"]["action_success"].as_f64().unwrap();
    let consumer_done = report["consumer"]["action_success"].as_f64().unwrap();
    let slow_done = report["slow"]["action_success"].as_f64().unwrap();

    assert!(
        consumer_done < slow_done,
        "consumer should not have waited for the slow dependency"
    );
    assert!(fast_done <= consumer_done);
}
