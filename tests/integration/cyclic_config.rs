#[path = "common/mod.rs"]
mod common;

use predicates::prelude::*;

/// Scenario 2: a config with a dependency cycle must be rejected before
/// any service starts, with a non-zero exit and an error message naming
/// the cycle.
#[test]
fn cyclic_config_is_rejected() {
    let run_dir = tempfile::tempdir().unwrap();

    let config = r#"
services:
  a:
    command: "echo a"
    dependency:
      mode: all
      items:
        b: started
  b:
    command: "echo b"
    dependency:
      mode: all
      items:
        a: started
"#;
    common::write_file(run_dir.path(), "workflow.yaml", config);
    let config_path = run_dir.path().join("workflow.yaml");

    common::run_shepherd(run_dir.path(), &config_path)
        .failure()
        .stderr(predicate::str::contains("cyclic"));

    assert!(!run_dir.path().join("state_times.json").exists());
}
