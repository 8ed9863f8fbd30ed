//! Config loading, preprocessing, and dependency topology for shepherd.
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Whether a dependency (state or file) requirement must ALL be satisfied,
/// or just ANY one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    All,
    Any,
}

impl Default for DependencyMode {
    fn default() -> Self {
        DependencyMode::All
    }
}

/// Whether a service is a one-shot command expected to exit (`Action`,
/// the default) or a long-running process expected to run until stopped
/// (`Service`). Drives exit-code classification in the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Action,
    Service,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Action
    }
}

/// A dependency on other services reaching a given state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    #[serde(default)]
    pub mode: DependencyMode,
    /// Dependency service name -> required state.
    pub items: HashMap<String, String>,
}

/// A single file-existence-and-size dependency item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileDependencyItem {
    pub path: String,
    #[serde(default = "default_min_size")]
    pub min_size: u64,
}

fn default_min_size() -> u64 {
    1
}

/// A dependency on files reaching a minimum size, checked before the
/// dependency-state wait. The "degenerate tailer" described in spec §9.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileDependencyConfig {
    #[serde(default)]
    pub mode: DependencyMode,
    pub items: Vec<FileDependencyItem>,
}

/// The log file a service's state machine is tailing, and the
/// ordered keyword -> state rules that advance it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateFileConfig {
    pub path: String,
    pub states: IndexMap<String, String>,
}

/// State-advancement rules for a service: its own stdout log, and
/// optionally a second file to monitor independently.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateConfig {
    #[serde(default)]
    pub log: IndexMap<String, String>,
    #[serde(default)]
    pub file: Option<StateFileConfig>,
}

/// A single service definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub command: String,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(rename = "dependency", default)]
    pub dependencies: Option<DependencyConfig>,
    #[serde(rename = "file_dependency", default)]
    pub file_dependencies: Option<FileDependencyConfig>,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub stdout_path: Option<String>,
    #[serde(default)]
    pub stderr_path: Option<String>,
}

/// Where to put per-service output logs and the final report, if not the
/// default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub stdout_dir: Option<String>,
    #[serde(default = "default_state_times_name")]
    pub state_times: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            stdout_dir: None,
            state_times: default_state_times_name(),
        }
    }
}

fn default_state_times_name() -> String {
    "state_times.json".to_string()
}

/// Top-level workflow config, as loaded from YAML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    pub services: IndexMap<String, ServiceConfig>,
    #[serde(default = "default_stop_signal")]
    pub stop_signal: String,
    #[serde(default)]
    pub max_run_time: Option<u64>,
    #[serde(default = "default_process_timeout")]
    pub process_timeout: u64,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub cleanup_command: Option<String>,

    /// Directory containing the config file, used to resolve relative
    /// output paths. Not part of the YAML schema.
    #[serde(skip)]
    pub config_dir: PathBuf,

    /// Dependency-ordered service names, computed by `service_start_order`.
    #[serde(skip)]
    pub start_order: Vec<String>,
}

fn default_stop_signal() -> String {
    "stop.txt".to_string()
}

fn default_process_timeout() -> u64 {
    10
}

/// Expands `${VAR}` and `$VAR` references in `text` against the current
/// process environment. Unlike the reference implementation this returns
/// an error rather than panicking on an unresolved name.
fn expand_env_vars(text: &str) -> Result<String, OrchestratorError> {
    let re = Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("static regex is valid");
    let mut err = None;
    let expanded = re.replace_all(text, |caps: &regex::Captures| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(val) => val,
            Err(_) => {
                err.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    if let Some(name) = err {
        return Err(OrchestratorError::EnvVarExpansionError { name });
    }
    Ok(expanded.into_owned())
}

/// Resolves relative `stdout_path`/`stderr_path` for every service
/// (auto-naming them first if absent), and resolves `state.file.path`
/// against the output directory, mirroring the reference
/// implementation's `preprocess_config`.
fn preprocess(config: &mut WorkflowConfig) {
    let base_dir = config
        .output
        .stdout_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.config_dir.clone());

    let resolve = |base_dir: &Path, raw: &str| -> String {
        let path = PathBuf::from(raw);
        if path.is_relative() {
            base_dir.join(path).to_string_lossy().into_owned()
        } else {
            raw.to_string()
        }
    };

    for (name, service) in config.services.iter_mut() {
        service.stdout_path = Some(match &service.stdout_path {
            Some(path) => resolve(&base_dir, path),
            None => base_dir
                .join(format!("{name}_stdout.log"))
                .to_string_lossy()
                .into_owned(),
        });
        service.stderr_path = Some(match &service.stderr_path {
            Some(path) => resolve(&base_dir, path),
            None => base_dir
                .join(format!("{name}_stderr.log"))
                .to_string_lossy()
                .into_owned(),
        });
        if let Some(state_file) = service.state.file.as_mut() {
            let path = PathBuf::from(&state_file.path);
            if path.is_relative() {
                state_file.path = base_dir.join(path).to_string_lossy().into_owned();
            }
        }
    }
}

/// Validates that every service has a command and that every declared
/// dependency refers to a known service.
fn validate(config: &WorkflowConfig) -> Result<(), OrchestratorError> {
    for (name, service) in &config.services {
        if service.command.trim().is_empty() {
            return Err(OrchestratorError::MissingCommand {
                service: name.clone(),
            });
        }
        if let Some(deps) = &service.dependencies {
            for dep in deps.items.keys() {
                if !config.services.contains_key(dep) {
                    return Err(OrchestratorError::UnknownDependency {
                        service: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Computes a dependency-respecting start order via Kahn's algorithm,
/// using a `BTreeSet` frontier so ties resolve in a deterministic
/// (alphabetical) order. Returns a `DependencyCycle` error naming the
/// services still unresolved when the frontier runs dry.
fn service_start_order(config: &WorkflowConfig) -> Result<Vec<String>, OrchestratorError> {
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();

    for name in config.services.keys() {
        indegree.entry(name.as_str()).or_insert(0);
        graph.entry(name.as_str()).or_default();
    }

    for (name, service) in &config.services {
        if let Some(deps) = &service.dependencies {
            for dep in deps.items.keys() {
                graph.entry(dep.as_str()).or_default().push(name.as_str());
                *indegree.entry(name.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&name, _)| name)
        .collect();

    let mut order = Vec::with_capacity(config.services.len());
    while let Some(next) = ready.iter().next().copied() {
        ready.remove(next);
        order.push(next.to_string());
        if let Some(dependents) = graph.get(next) {
            for &dependent in dependents {
                let entry = indegree.get_mut(dependent).expect("dependent is tracked");
                *entry -= 1;
                if *entry == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() != config.services.len() {
        let mut remaining: Vec<&str> = indegree
            .keys()
            .filter(|name| !order.iter().any(|o| o == *name))
            .copied()
            .collect();
        remaining.sort_unstable();
        return Err(OrchestratorError::DependencyCycle {
            cycle: remaining.join(" -> "),
        });
    }

    Ok(order)
}

/// Loads, expands, parses, preprocesses, validates, and topologically
/// sorts the workflow config at `path`.
pub fn load_config(path: &Path) -> Result<WorkflowConfig, OrchestratorError> {
    let raw = std::fs::read_to_string(path).map_err(|source| OrchestratorError::ConfigReadError {
        path: path.display().to_string(),
        source,
    })?;

    let expanded = expand_env_vars(&raw)?;

    let mut config: WorkflowConfig =
        serde_yaml::from_str(&expanded).map_err(|source| OrchestratorError::ConfigParseError {
            path: path.display().to_string(),
            source,
        })?;

    config.config_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    preprocess(&mut config);
    validate(&config)?;
    config.start_order = service_start_order(&config)?;

    Ok(config)
}
