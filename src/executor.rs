//! Per-service execution engine: waits for dependencies, launches the
//! service's command in its own process group, tails its log for state
//! transitions, and classifies its exit.
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{DependencyMode, ServiceConfig, TaskType};
use crate::coordination::SharedState;
use crate::tailer;

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs one service to completion: dependency waits, spawn, log tailing,
/// exit classification. Intended to run on its own thread; never panics
/// across the thread boundary. Failures are logged and the service is
/// transitioned to a terminal state so the scheduler's "all final" check
/// still converges.
pub fn run(shared: Arc<SharedState>, name: String, service: ServiceConfig, working_dir: std::path::PathBuf) {
    if let Err(err) = shared.transition(&name, "initialized") {
        warn!(service = %name, %err, "failed to record initialized state");
        return;
    }

    if let Some(stdout_path) = &service.stdout_path {
        if let Some(parent) = Path::new(stdout_path).parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(service = %name, %err, "failed to create stdout directory");
            }
        }
    }
    if let Some(stderr_path) = &service.stderr_path {
        if let Some(parent) = Path::new(stderr_path).parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(service = %name, %err, "failed to create stderr directory");
            }
        }
    }

    if !wait_for_file_dependencies(&shared, &name, &service) {
        record_stopped_before_execution(&shared, &name);
        return;
    }

    if !wait_for_dependencies(&shared, &name, &service) {
        record_stopped_before_execution(&shared, &name);
        return;
    }

    if let Err(err) = shared.transition(&name, "started") {
        warn!(service = %name, %err, "failed to record started state");
        return;
    }

    let mut handles = Vec::new();
    if let Some(stdout_path) = service.stdout_path.clone() {
        if !service.state.log.is_empty() {
            let shared = Arc::clone(&shared);
            let name = name.clone();
            let keywords = service.state.log.clone();
            handles.push(std::thread::spawn(move || {
                tailer::tail(&shared, &name, Path::new(&stdout_path), &keywords);
            }));
        }
    }
    if let Some(state_file) = service.state.file.clone() {
        if !state_file.states.is_empty() {
            let shared = Arc::clone(&shared);
            let name = name.clone();
            handles.push(std::thread::spawn(move || {
                tailer::tail(&shared, &name, Path::new(&state_file.path), &state_file.states);
            }));
        }
    }

    let exit_state = spawn_and_wait(&shared, &name, &service, &working_dir);

    if let Err(err) = shared.transition(&name, &exit_state) {
        warn!(service = %name, %err, "failed to record exit state");
    }
    if let Err(err) = shared.transition(&name, "final") {
        warn!(service = %name, %err, "failed to record final state");
    }

    for handle in handles {
        let _ = handle.join();
    }
}

fn record_stopped_before_execution(shared: &Arc<SharedState>, name: &str) {
    if let Err(err) = shared.transition(name, "stopped_before_execution") {
        warn!(service = %name, %err, "failed to record stopped_before_execution state");
    }
    if let Err(err) = shared.transition(name, "final") {
        warn!(service = %name, %err, "failed to record final state");
    }
}

/// Blocks until every (or any, per mode) configured file dependency
/// reaches its minimum size, or the stop event fires. Returns `false` if
/// interrupted by a stop request.
fn wait_for_file_dependencies(shared: &Arc<SharedState>, name: &str, service: &ServiceConfig) -> bool {
    let Some(file_deps) = &service.file_dependencies else {
        return true;
    };
    if file_deps.items.is_empty() {
        return true;
    }

    loop {
        match shared.is_stopped() {
            Ok(true) | Err(_) => return false,
            Ok(false) => {}
        }

        let satisfied = |item: &crate::config::FileDependencyItem| {
            std::fs::metadata(&item.path)
                .map(|m| m.len() >= item.min_size)
                .unwrap_or(false)
        };

        let done = match file_deps.mode {
            DependencyMode::All => file_deps.items.iter().all(satisfied),
            DependencyMode::Any => file_deps.items.iter().any(satisfied),
        };
        if done {
            debug!(service = %name, "file dependencies satisfied");
            return true;
        }
        std::thread::sleep(CHILD_POLL_INTERVAL);
    }
}

/// Blocks until the configured state dependencies are satisfied (checked
/// against `state_times`, never the instantaneous `state`, so a
/// dependency that passed through a required state transiently is still
/// observed), or the stop event fires.
fn wait_for_dependencies(shared: &Arc<SharedState>, name: &str, service: &ServiceConfig) -> bool {
    let Some(deps) = &service.dependencies else {
        return true;
    };
    if deps.items.is_empty() {
        return true;
    }

    let satisfied = shared
        .wait_for(|times| {
            let check = |dep: &str, required: &str| {
                times.get(dep).is_some_and(|t| t.contains_key(required))
            };
            match deps.mode {
                DependencyMode::All => deps.items.iter().all(|(dep, req)| check(dep, req)),
                DependencyMode::Any => deps.items.iter().any(|(dep, req)| check(dep, req)),
            }
        })
        .unwrap_or(false);

    if satisfied {
        debug!(service = %name, "dependencies satisfied");
    }
    satisfied
}

/// Spawns the service's command in its own session (so the scheduler can
/// signal the whole process group later), polls it to completion, and
/// classifies the exit per the first-match rule: stopped (killed by our
/// own SIGTERM during shutdown), failure (a `service` that exited on its
/// own while no stop was requested), action_success / action_failure (an
/// `action` that exited, classified by exit code).
fn spawn_and_wait(
    shared: &Arc<SharedState>,
    name: &str,
    service: &ServiceConfig,
    working_dir: &Path,
) -> String {
    let stdout = open_output(service.stdout_path.as_deref());
    let stderr = open_output(service.stderr_path.as_deref());

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&service.command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);

    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))?;
            Ok(())
        });
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(service = %name, %err, "failed to spawn service command");
            return "failure".to_string();
        }
    };

    let pid = child.id() as i32;
    if let Err(err) = shared.publish_pgid(name, pid) {
        warn!(service = %name, %err, "failed to publish process group id");
    }

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return classify_exit(shared, name, service, status);
            }
            Ok(None) => std::thread::sleep(CHILD_POLL_INTERVAL),
            Err(err) => {
                warn!(service = %name, %err, "failed to poll service process");
                return "failure".to_string();
            }
        }
    }
}

fn classify_exit(
    shared: &Arc<SharedState>,
    name: &str,
    service: &ServiceConfig,
    status: std::process::ExitStatus,
) -> String {
    use std::os::unix::process::ExitStatusExt;

    let stopped = shared.is_stopped().unwrap_or(false);
    let killed_by_term = status.signal() == Some(libc::SIGTERM);

    if stopped && killed_by_term {
        info!(service = %name, "service stopped by shutdown signal");
        return "stopped".to_string();
    }

    match service.task_type {
        TaskType::Service => {
            if !stopped {
                warn!(service = %name, "service exited unexpectedly");
                "failure".to_string()
            } else {
                "stopped".to_string()
            }
        }
        TaskType::Action => {
            if status.success() {
                info!(service = %name, "action completed successfully");
                "action_success".to_string()
            } else {
                warn!(service = %name, ?status, "action exited with failure");
                "action_failure".to_string()
            }
        }
    }
}

fn open_output(path: Option<&str>) -> Stdio {
    match path {
        Some(path) => std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map(Stdio::from)
            .unwrap_or_else(|_| Stdio::null()),
        None => Stdio::null(),
    }
}
