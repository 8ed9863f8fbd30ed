//! The workflow scheduler: spawns one executor thread per service in
//! dependency order, watches for stop conditions, and drives shutdown.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::config::WorkflowConfig;
use crate::coordination::SharedState;
use crate::error::OrchestratorError;
use crate::executor;
use crate::reporter;

const STOP_WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Runs `config`'s workflow to completion in `working_dir`, writing the
/// final state-times report before returning. Blocks until every service
/// reaches a terminal state. `run_dir` is the directory whose `control/`
/// subdirectory is watched for the stop-signal file; it may be the same
/// directory as `working_dir` or a different one.
pub fn run(config: WorkflowConfig, run_dir: PathBuf, working_dir: PathBuf) -> Result<(), OrchestratorError> {
    let service_names: Vec<String> = config.start_order.clone();
    let shared = SharedState::new(service_names.clone());

    // SIGINT/SIGTERM to the scheduler process itself both resolve to a
    // stop request through the shared coordination state, same as the
    // stop-signal file and max_run_time paths below.
    let ctrlc_shared = Arc::clone(&shared);
    ctrlc::set_handler(move || {
        info!("received interrupt, requesting shutdown");
        let _ = ctrlc_shared.request_stop();
    })?;

    let stop_signal_path = run_dir.join("control").join(&config.stop_signal);

    let mut handles = Vec::new();
    for name in &service_names {
        let service = config.services[name].clone();
        let shared = Arc::clone(&shared);
        let name = name.clone();
        let working_dir = working_dir.clone();
        handles.push(std::thread::spawn(move || {
            executor::run(shared, name, service, working_dir);
        }));
    }

    watch_stop_conditions(&shared, &config, &stop_signal_path);

    shutdown(&shared, &config, &working_dir)?;

    for handle in handles {
        let _ = handle.join();
    }

    if stop_signal_path.exists() {
        if let Err(err) = std::fs::remove_file(&stop_signal_path) {
            warn!(%err, "failed to remove stop signal file");
        }
    }

    let state_times = shared.state_times_snapshot()?;
    let report_path = working_dir.join(&config.output.state_times);
    reporter::write_report(&state_times, &report_path)?;

    Ok(())
}

/// Blocks until one of the stop conditions fires: the stop-signal file
/// appears, `max_run_time` elapses, every service reaches a terminal
/// state, or an external caller (e.g. a SIGINT handler) has already
/// requested stop through `shared`.
fn watch_stop_conditions(shared: &Arc<SharedState>, config: &WorkflowConfig, stop_signal_path: &std::path::Path) {
    loop {
        if shared.is_stopped().unwrap_or(true) {
            return;
        }
        if stop_signal_path.exists() {
            info!("stop signal file detected");
            let _ = shared.request_stop();
            return;
        }
        if let Some(max_run_time) = config.max_run_time {
            if shared.elapsed() >= max_run_time as f64 {
                info!(max_run_time, "max run time exceeded");
                let _ = shared.request_stop();
                return;
            }
        }
        if shared.all_final().unwrap_or(false) {
            info!("all services reached a terminal state");
            let _ = shared.request_stop();
            return;
        }
        std::thread::sleep(STOP_WATCH_INTERVAL);
    }
}

/// Runs the optional cleanup command, then fans SIGTERM out to every
/// known process group, escalating to SIGKILL for stragglers still alive
/// after `process_timeout`.
fn shutdown(
    shared: &Arc<SharedState>,
    config: &WorkflowConfig,
    working_dir: &std::path::Path,
) -> Result<(), OrchestratorError> {
    let _ = shared.request_stop();

    if let Some(cleanup_command) = &config.cleanup_command {
        info!(command = %cleanup_command, "running cleanup command");
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(cleanup_command)
            .current_dir(working_dir)
            .status();
        if let Err(err) = status {
            warn!(%err, "cleanup command failed to run");
        }
    }

    let pgids = shared.pgid_snapshot()?;
    for name in shared.service_names() {
        match pgids.get(name) {
            Some(pgid) => {
                info!(service = %name, pgid, "sending SIGTERM to process group");
                let _ = signal::killpg(Pid::from_raw(*pgid), Signal::SIGTERM);
            }
            None => {
                warn!(service = %name, "no process group recorded, nothing to signal");
            }
        }
    }

    wait_for_graceful_exit(shared, config.process_timeout);

    escalate_stragglers(&pgids, shared, config)?;

    Ok(())
}

/// Waits up to `process_timeout` seconds for every service to reach a
/// terminal state on its own, polling frequently so a workflow that was
/// already finished (or that dies quickly under SIGTERM) does not pay
/// the full grace period.
fn wait_for_graceful_exit(shared: &Arc<SharedState>, process_timeout: u64) {
    let deadline = std::time::Instant::now() + Duration::from_secs(process_timeout);
    while std::time::Instant::now() < deadline {
        if shared.all_final().unwrap_or(false) {
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Sends SIGKILL to any service whose pgid is still alive after the
/// graceful shutdown window, and logs a warning for each escalation.
fn escalate_stragglers(
    pgids: &HashMap<String, i32>,
    shared: &Arc<SharedState>,
    _config: &WorkflowConfig,
) -> Result<(), OrchestratorError> {
    for name in shared.service_names() {
        let Some(pgid) = pgids.get(name) else { continue };
        let still_alive = signal::killpg(Pid::from_raw(*pgid), None::<Signal>).is_ok();
        if still_alive {
            warn!(service = %name, pgid, "process group did not stop in time, escalating to SIGKILL");
            let _ = signal::killpg(Pid::from_raw(*pgid), Signal::SIGKILL);
        }
    }
    Ok(())
}
