//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;
use todo_lab::app::{self, Frontend};
use todo_lab::observable::Subscriber;
use todo_lab::time::ManualClock;

pub type Log<E> = Arc<Mutex<Vec<E>>>;

/// Fixed starting instant for every clock-dependent test.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn manual_clock() -> ManualClock {
    ManualClock::new(start_time())
}

/// Subscriber appending `(value, action)` to a shared log.
pub fn recording_subscriber<T, A>() -> (Subscriber<T, A>, Log<(T, A)>)
where
    T: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    let log: Log<(T, A)> = Arc::default();
    let sink = Arc::clone(&log);
    let subscriber = Subscriber::new(move |value: &T, action: &A| {
        sink.lock().push((value.clone(), action.clone()));
    });
    (subscriber, log)
}

/// Write `content` to a `config.toml` in a fresh temp dir.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    (temp_dir, path)
}

/// Feed `script` to the REPL and return everything it printed.
pub fn run_script(frontend: &mut dyn Frontend, script: &str) -> String {
    let mut output = Vec::new();
    app::run(frontend, script.as_bytes(), &mut output).expect("session failed");
    String::from_utf8(output).expect("output is UTF-8")
}
