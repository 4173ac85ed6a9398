//! Clocks, human-readable durations and relative timestamps.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time. Injected so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

struct TimeUnit {
    name: &'static str,
    abbr: &'static str,
    millis: u64,
}

const UNITS: [TimeUnit; 5] = [
    TimeUnit { name: "day", abbr: "d", millis: 86_400_000 },
    TimeUnit { name: "hour", abbr: "hr", millis: 3_600_000 },
    TimeUnit { name: "minute", abbr: "min", millis: 60_000 },
    TimeUnit { name: "second", abbr: "sec", millis: 1_000 },
    TimeUnit { name: "millisecond", abbr: "ms", millis: 1 },
];

/// Render `millis` using up to `graduations` consecutive units, starting at
/// the largest unit strictly smaller than the duration.
///
/// One graduation gives a rounded `"<n> <unit>"`; more give floored
/// abbreviated parts, e.g. `"1 hr 30 min"`.
pub fn duration_to_words(millis: u64, graduations: usize) -> String {
    let Some(first) = UNITS.iter().position(|unit| unit.millis < millis) else {
        return "0 milliseconds".to_string();
    };
    let units = &UNITS[first..(first + graduations).min(UNITS.len())];

    if let [unit] = units {
        let count = (millis + unit.millis / 2) / unit.millis;
        return format!("{count} {}", unit.name);
    }

    let mut remaining = millis;
    units
        .iter()
        .map(|unit| {
            let count = remaining / unit.millis;
            remaining -= count * unit.millis;
            format!("{count} {}", unit.abbr)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const AGO_UNITS: [(&str, i64); 6] = [
    ("year", 31_536_000),
    ("month", 2_592_000),
    ("week", 604_800),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
];

/// Relative description of `then` as seen from `now`: "just now",
/// "3 minutes ago", "in 2 days".
pub fn format_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let magnitude = seconds.abs();
    if magnitude < 45 {
        return "just now".to_string();
    }

    let (name, size) = AGO_UNITS
        .iter()
        .copied()
        .find(|(_, size)| magnitude >= *size)
        .unwrap_or(("minute", 60));
    let count = (magnitude / size).max(1);
    let plural = if count == 1 { "" } else { "s" };

    if seconds < 0 {
        format!("in {count} {name}{plural}")
    } else {
        format!("{count} {name}{plural} ago")
    }
}
