//! Error handling for shepherd.
use thiserror::Error;

/// Defines all possible errors that can occur while loading configuration
/// or orchestrating a workflow. Anything that reaches `main` as this type
/// is fatal: the process exits non-zero without (or before completing)
/// the run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The `--run-dir` argument does not exist or is not a directory.
    #[error("run directory not found: {0}")]
    RunDirNotFound(String),

    /// The `--work-dir` argument does not exist or is not a directory.
    #[error("working directory not found: {0}")]
    WorkDirNotFound(String),

    /// Error reading the config file from disk.
    #[error("failed to read config file {path}: {source}")]
    ConfigReadError {
        /// Path to the config file that could not be read.
        path: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error parsing YAML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ConfigParseError {
        /// Path to the config file that failed to parse.
        path: String,
        /// The underlying error that occurred.
        #[source]
        source: serde_yaml::Error,
    },

    /// Error expanding a `${VAR}` reference in the config file.
    #[error("environment variable '{name}' referenced in config is not set")]
    EnvVarExpansionError {
        /// Name of the unresolved variable.
        name: String,
    },

    /// A service definition is missing a required field.
    #[error("service '{service}' has no command")]
    MissingCommand {
        /// The service missing a command.
        service: String,
    },

    /// Error when a dependency reference is undefined in the configuration.
    #[error("service '{service}' declares unknown dependency '{dependency}'")]
    UnknownDependency {
        /// The service with an invalid dependency reference.
        service: String,
        /// The missing dependency name.
        dependency: String,
    },

    /// Error when the dependency graph contains a cycle.
    #[error("cyclic dependency detected among services: {cycle}")]
    DependencyCycle {
        /// Human-readable cycle description (e.g. `a -> b -> a`).
        cycle: String,
    },

    /// Error creating a directory required by the run (output dirs, log dir).
    #[error("failed to create directory {path}: {source}")]
    CreateDirError {
        /// Path that could not be created.
        path: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error spawning a service process.
    #[error("failed to start service '{service}': {source}")]
    ServiceSpawnError {
        /// The service name that failed to start.
        service: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error writing the final state-times report.
    #[error("failed to write state-times report to {path}: {source}")]
    ReportWriteError {
        /// Destination path for the report.
        path: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error serializing the state-times report.
    #[error("failed to serialize state-times report: {0}")]
    ReportSerializeError(#[from] serde_json::Error),

    /// Error for poisoned coordination mutex.
    #[error("internal coordination lock was poisoned: {0}")]
    LockPoisoned(String),

    /// Error installing or delivering a Unix signal.
    #[error("signal handling error: {0}")]
    SignalError(#[from] nix::errno::Errno),

    /// Error installing the Ctrl-C handler.
    #[error("failed to install signal handler: {0}")]
    CtrlcError(#[from] ctrlc::Error),
}

impl<T> From<std::sync::PoisonError<T>> for OrchestratorError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        OrchestratorError::LockPoisoned(err.to_string())
    }
}
