#[path = "common/mod.rs"]
mod common;

/// Scenario 1: a linear A -> B -> C chain of one-shot actions. Each waits
/// on the previous reaching `action_success` before starting, so the
/// recorded timestamps must be strictly increasing.
#[test]
fn linear_chain_runs_in_dependency_order() {
    let run_dir = tempfile::tempdir().unwrap();

    let config = r#"
services:
  a:
    command: "echo a"
    type: action
  b:
    command: "echo b"
    type: action
    dependency:
      mode: all
      items:
        a: action_success
  c:
    command: "echo c"
    type: action
    dependency:
      mode: all
      items:
        b: action_success
max_run_time: 10
"#;
    common::write_file(run_dir.path(), "workflow.yaml", config);
    let config_path = run_dir.path().join("workflow.yaml");

    common::run_shepherd(run_dir.path(), &config_path).success();

    let report = common::read_state_times(run_dir.path());
    let a_success = report["a"]["action_success"].as_f64().unwrap();
    let b_success = report["b"]["action_success"].as_f64().unwrap();
    let c_success = report["c"]["action_success"].as_f64().unwrap();

    assert!(a_success <= b_success, "a must finish no later than b");
    assert!(b_success <= c_success, "b must finish no later than c");
    assert!(report["a"].get("final").is_some());
    assert!(report["b"].get("final").is_some());
    assert!(report["c"].get("final").is_some());
}
