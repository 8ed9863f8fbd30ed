//! The coordination substrate shared by every service executor and the
//! workflow scheduler: a state map, a per-service state-time map, a
//! broadcast condition variable, and a one-shot stop event.
//!
//! Reimplemented here as a single-process, multi-threaded structure
//! (`Arc<Mutex<Inner>>` + `Condvar`) rather than cross-process shared
//! memory, per the architecture note that licenses this substitution as
//! long as the coordination vocabulary (`state`, `state_times`, `pgid`,
//! `stop_event`) is preserved.
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use indexmap::IndexMap;

use crate::error::OrchestratorError;

#[derive(Debug, Default)]
struct Inner {
    state: HashMap<String, String>,
    state_times: HashMap<String, IndexMap<String, f64>>,
    pgid: HashMap<String, i32>,
    stop_requested: bool,
}

/// Shared coordination state for one workflow run.
pub struct SharedState {
    inner: Mutex<Inner>,
    cond: Condvar,
    start: Instant,
    services: Vec<String>,
}

impl SharedState {
    /// Creates a fresh coordination state for the given set of service
    /// names, each starting with an empty current state.
    pub fn new(services: Vec<String>) -> Arc<SharedState> {
        let mut state = HashMap::new();
        let mut state_times = HashMap::new();
        for name in &services {
            state.insert(name.clone(), String::new());
            state_times.insert(name.clone(), IndexMap::new());
        }
        Arc::new(SharedState {
            inner: Mutex::new(Inner {
                state,
                state_times,
                pgid: HashMap::new(),
                stop_requested: false,
            }),
            cond: Condvar::new(),
            start: Instant::now(),
            services,
        })
    }

    /// Seconds elapsed since this coordination state was created.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// All service names known to this run, in the order passed to `new`.
    pub fn service_names(&self) -> &[String] {
        &self.services
    }

    /// Records `service` entering `new_state` at the current elapsed time
    /// and wakes every thread waiting on a dependency or termination
    /// condition. A state is recorded at most once per service: repeat
    /// transitions to an already-recorded state are no-ops, matching the
    /// "write-once" state_times invariant.
    pub fn transition(&self, service: &str, new_state: &str) -> Result<(), OrchestratorError> {
        let mut inner = self.inner.lock()?;
        let now = self.start.elapsed().as_secs_f64();
        inner
            .state
            .insert(service.to_string(), new_state.to_string());
        let times = inner.state_times.entry(service.to_string()).or_default();
        if !times.contains_key(new_state) {
            times.insert(new_state.to_string(), now);
        }
        self.cond.notify_all();
        Ok(())
    }

    /// Records the process-group id for `service`, so the scheduler can
    /// later signal it during shutdown.
    pub fn publish_pgid(&self, service: &str, pgid: i32) -> Result<(), OrchestratorError> {
        let mut inner = self.inner.lock()?;
        inner.pgid.insert(service.to_string(), pgid);
        self.cond.notify_all();
        Ok(())
    }

    /// Snapshot of every service's recorded process-group id.
    pub fn pgid_snapshot(&self) -> Result<HashMap<String, i32>, OrchestratorError> {
        Ok(self.inner.lock()?.pgid.clone())
    }

    /// Current state of `service`, or `None` if unknown.
    pub fn current_state(&self, service: &str) -> Result<Option<String>, OrchestratorError> {
        Ok(self.inner.lock()?.state.get(service).cloned())
    }

    /// Sets the stop flag and wakes every waiting thread. Idempotent.
    pub fn request_stop(&self) -> Result<(), OrchestratorError> {
        let mut inner = self.inner.lock()?;
        inner.stop_requested = true;
        self.cond.notify_all();
        Ok(())
    }

    /// Whether `request_stop` has been called.
    pub fn is_stopped(&self) -> Result<bool, OrchestratorError> {
        Ok(self.inner.lock()?.stop_requested)
    }

    /// Blocks the calling thread until either `predicate` holds (evaluated
    /// against the current `state_times` snapshot) or the stop event
    /// fires. Returns `true` if the predicate was satisfied, `false` if
    /// the wait ended because of a stop request.
    pub fn wait_for<F>(&self, mut predicate: F) -> Result<bool, OrchestratorError>
    where
        F: FnMut(&HashMap<String, IndexMap<String, f64>>) -> bool,
    {
        let mut inner = self.inner.lock()?;
        loop {
            if inner.stop_requested {
                return Ok(false);
            }
            if predicate(&inner.state_times) {
                return Ok(true);
            }
            inner = self
                .cond
                .wait_timeout(inner, std::time::Duration::from_millis(200))?
                .0;
        }
    }

    /// True once every tracked service has reached a terminal state
    /// (`final` is recorded in its state_times).
    pub fn all_final(&self) -> Result<bool, OrchestratorError> {
        let inner = self.inner.lock()?;
        Ok(self
            .services
            .iter()
            .all(|name| inner.state_times.get(name).is_some_and(|t| t.contains_key("final"))))
    }

    /// Deep snapshot of the full state_times map, suitable for the
    /// reporter to serialize.
    pub fn state_times_snapshot(
        &self,
    ) -> Result<HashMap<String, IndexMap<String, f64>>, OrchestratorError> {
        Ok(self.inner.lock()?.state_times.clone())
    }
}
