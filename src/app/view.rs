//! Text views and the screen buffer they paint into.
//!
//! Each component owns one region of the [`Screen`]. The observable front-end
//! repaints a region only when its bindings fire; the reducer front-end
//! repaints all of them per intent. `show` prints whatever is on screen.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::stats::RenderStats;
use crate::time::{duration_to_words, format_ago};
use crate::todo::{ItemId, TodoSnapshot};

/// Component names used for render counting.
pub mod component {
    pub const APP: &str = "App";
    pub const LIST: &str = "ToDoList";
    pub const ITEM: &str = "ToDoItem";
    pub const STATS: &str = "ToDoStats";
    pub const TOP: &str = "Top3ToDo";
    pub const AVERAGE: &str = "AvgCompletionTime";
}

#[derive(Debug, Default)]
struct ScreenState {
    order: Vec<ItemId>,
    rows: HashMap<ItemId, String>,
    summary: String,
    top: Vec<String>,
    average: String,
}

/// Retained text regions. Clones paint the same screen.
#[derive(Debug, Clone)]
pub struct Screen {
    title: Arc<str>,
    state: Arc<Mutex<ScreenState>>,
}

impl Screen {
    pub fn new(title: &str) -> Self {
        Self {
            title: Arc::from(title),
            state: Arc::default(),
        }
    }

    /// Set the row order. Rows not listed are dropped.
    pub fn set_order(&self, order: Vec<ItemId>) {
        let mut state = self.state.lock();
        state.rows.retain(|id, _| order.contains(id));
        state.order = order;
    }

    pub fn set_row(&self, id: ItemId, line: String) {
        self.state.lock().rows.insert(id, line);
    }

    pub fn set_summary(&self, line: String) {
        self.state.lock().summary = line;
    }

    pub fn set_top(&self, lines: Vec<String>) {
        self.state.lock().top = lines;
    }

    pub fn set_average(&self, line: String) {
        self.state.lock().average = line;
    }

    /// Full screen text, ending with the render-count footer.
    pub fn compose(&self, stats: &RenderStats) -> String {
        let state = self.state.lock();
        let mut out = format!("== To-do list ({}) ==\n", self.title);
        let rows: Vec<&String> = state.order.iter().filter_map(|id| state.rows.get(id)).collect();
        if rows.is_empty() {
            out.push_str("  (nothing to do)\n");
        }
        for row in rows {
            let _ = writeln!(out, "  {row}");
        }
        let _ = writeln!(out, "-- {}", state.summary);
        for line in &state.top {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "{}", state.average);
        out.push_str(&footer_line(stats));
        out
    }
}

/// One list row, e.g. `[x] #3 Write report (done in 1 d 2 hr)`.
pub fn item_line(item: &TodoSnapshot, now: DateTime<Utc>, graduations: usize) -> String {
    let mark = if item.completed { 'x' } else { ' ' };
    let detail = match item.completion_time() {
        Some(took) => format!("done in {}", duration_to_words(millis(took), graduations)),
        None => format!("added {}", format_ago(item.date_created, now)),
    };
    format!("[{mark}] #{} {} ({detail})", item.id, item.action)
}

pub fn summary_line(total: usize, completed: usize) -> String {
    let noun = if total == 1 { "task" } else { "tasks" };
    format!("{total} {noun}, {completed} completed")
}

/// Numbered top tasks; `open` is already ordered and truncated.
pub fn top_lines(count: usize, open: &[TodoSnapshot]) -> Vec<String> {
    let mut lines = vec![format!("Top {count}:")];
    if open.is_empty() {
        lines.push("  (all done)".to_string());
    }
    lines.extend(
        open.iter()
            .enumerate()
            .map(|(rank, item)| format!("  {}. {}", rank + 1, item.action)),
    );
    lines
}

/// Mean creation-to-completion time over completed items.
pub fn average_completion(items: &[TodoSnapshot]) -> Option<Duration> {
    let times: Vec<Duration> = items.iter().filter_map(TodoSnapshot::completion_time).collect();
    if times.is_empty() {
        return None;
    }
    let total: i64 = times.iter().map(Duration::num_milliseconds).sum();
    Some(Duration::milliseconds(total / times.len() as i64))
}

pub fn average_line(items: &[TodoSnapshot], graduations: usize) -> String {
    match average_completion(items) {
        Some(mean) => format!(
            "Average completion time: {}",
            duration_to_words(millis(mean), graduations)
        ),
        None => "Average completion time: n/a".to_string(),
    }
}

/// `Renders: App 1, ToDoItem 5, ...` in component-name order.
pub fn footer_line(stats: &RenderStats) -> String {
    let counts: Vec<String> = stats
        .snapshot()
        .into_iter()
        .map(|(component, count)| format!("{component} {count}"))
        .collect();
    format!("Renders: {}\n", counts.join(", "))
}

fn millis(duration: Duration) -> u64 {
    duration.num_milliseconds().max(0) as u64
}
