//! Log tailing: follows an append-only file and advances a service through
//! its state machine as ordered keywords appear in new lines.
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::debug;

use crate::coordination::SharedState;

const FILE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LINE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Follows `path`, matching each new line against `keywords` (service
/// state -> substring, in insertion order) and transitioning `service`
/// through `shared` for every match. Stops when the last entry in
/// `keywords` is matched, when the stop event fires, or on an I/O error
/// (logged, not propagated, since one tailer's failure must not affect
/// other services).
pub fn tail(shared: &Arc<SharedState>, service: &str, path: &Path, keywords: &IndexMap<String, String>) {
    if keywords.is_empty() {
        debug!(service, "no state keywords configured, skipping tailer");
        return;
    }

    while !path.exists() {
        match shared.is_stopped() {
            Ok(true) | Err(_) => {
                debug!(service, "stop requested before log file appeared");
                return;
            }
            Ok(false) => {}
        }
        std::thread::sleep(FILE_POLL_INTERVAL);
    }

    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_file() => {
            tracing::warn!(service, path = %path.display(), "log path is not a regular file, skipping tailer");
            return;
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(service, %err, "failed to stat log file for tailing");
            return;
        }
    }

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(err) => {
            tracing::warn!(service, %err, "failed to open log file for tailing");
            return;
        }
    };
    let mut reader = BufReader::new(file);
    let last_state = keywords.keys().last().cloned();

    loop {
        match shared.is_stopped() {
            Ok(true) | Err(_) => return,
            Ok(false) => {}
        }

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                // EOF: seek back to retry, mirroring tail -f semantics.
                if let Err(err) = reader.seek(SeekFrom::Current(0)) {
                    tracing::warn!(service, %err, "failed to seek log file");
                    return;
                }
                std::thread::sleep(LINE_POLL_INTERVAL);
                continue;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(service, %err, "failed to read log file");
                return;
            }
        }

        let mut reached_last = false;
        for (state, keyword) in keywords.iter() {
            if line.contains(keyword.as_str()) {
                if let Err(err) = shared.transition(service, state) {
                    tracing::warn!(service, %err, "failed to record state transition");
                    return;
                }
                debug!(service, state, "log tailer matched keyword");
                if Some(state) == last_state.as_ref() {
                    reached_last = true;
                    break;
                }
            }
        }
        if reached_last {
            break;
        }
    }
}
