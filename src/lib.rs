//! Dependency-ordered workflow orchestrator for shell services.

#![warn(unused_crate_dependencies)]
// These dependencies are only used in the binary (src/bin/main.rs)
// Test dependencies are only used in test code
#[cfg(test)]
use assert_cmd as _;
// chrono is only used for the start-time log line in src/bin/main.rs
use chrono as _;
#[cfg(test)]
use predicates as _;
#[cfg(test)]
use tempfile as _;
// tracing-subscriber is only used to configure logging in src/bin/main.rs
use tracing_subscriber as _;

/// CLI parsing.
pub mod cli;

/// Config loading, preprocessing, and dependency topology.
pub mod config;

/// The coordination substrate: shared state, state_times, pgid, stop event.
pub mod coordination;

/// Per-service execution engine.
pub mod executor;

/// Errors.
pub mod error;

/// Final state-times JSON report.
pub mod reporter;

/// The workflow scheduler.
pub mod scheduler;

/// Log tailing and state-transition matching.
pub mod tailer;
