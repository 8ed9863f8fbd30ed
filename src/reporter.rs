//! Serializes the final state_times snapshot to a JSON report.
use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::OrchestratorError;

/// Writes `state_times` as pretty-printed (2-space indent), deterministically
/// ordered JSON to `path`. Service and state keys are sorted so report
/// output is stable across runs regardless of thread scheduling order.
pub fn write_report(
    state_times: &std::collections::HashMap<String, IndexMap<String, f64>>,
    path: &Path,
) -> Result<(), OrchestratorError> {
    let sorted: BTreeMap<String, BTreeMap<String, f64>> = state_times
        .iter()
        .map(|(service, times)| {
            let times: BTreeMap<String, f64> =
                times.iter().map(|(k, v)| (k.clone(), *v)).collect();
            (service.clone(), times)
        })
        .collect();

    let json = serde_json::to_string_pretty(&sorted)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| OrchestratorError::CreateDirError {
            path: parent.display().to_string(),
            source,
        })?;
    }

    std::fs::write(path, json).map_err(|source| OrchestratorError::ReportWriteError {
        path: path.display().to_string(),
        source,
    })
}
