use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observable::{DiagnosticSink, ObservableValue};

pub type ItemId = u64;

/// A to-do item whose mutable fields are individually observable, so a view
/// can re-render for exactly the field it shows.
///
/// Cloning yields another handle to the same fields.
#[derive(Debug, Clone)]
pub struct TodoItem {
    id: ItemId,
    date_created: DateTime<Utc>,
    pub action: ObservableValue<String>,
    /// Lower number = more important.
    pub priority: ObservableValue<u32>,
    pub completed: ObservableValue<bool>,
    pub date_completed: ObservableValue<Option<DateTime<Utc>>>,
}

impl TodoItem {
    /// Open item whose fields report subscriber failures to `sink`.
    pub fn new(
        id: ItemId,
        action: impl Into<String>,
        priority: u32,
        date_created: DateTime<Utc>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            id,
            date_created,
            action: ObservableValue::with_sink(action.into(), Arc::clone(&sink)),
            priority: ObservableValue::with_sink(priority, Arc::clone(&sink)),
            completed: ObservableValue::with_sink(false, Arc::clone(&sink)),
            date_completed: ObservableValue::with_sink(None, sink),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    pub fn is_completed(&self) -> bool {
        self.completed.read()
    }

    pub fn snapshot(&self) -> TodoSnapshot {
        TodoSnapshot {
            id: self.id,
            action: self.action.read(),
            priority: self.priority.read(),
            completed: self.completed.read(),
            date_created: self.date_created,
            date_completed: self.date_completed.read(),
        }
    }
}

/// Plain copy of an item's fields at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoSnapshot {
    pub id: ItemId,
    pub action: String,
    pub priority: u32,
    pub completed: bool,
    pub date_created: DateTime<Utc>,
    pub date_completed: Option<DateTime<Utc>>,
}

impl TodoSnapshot {
    /// Time from creation to completion, for completed items.
    pub fn completion_time(&self) -> Option<chrono::Duration> {
        match (self.completed, self.date_completed) {
            (true, Some(done)) => Some(done - self.date_created),
            _ => None,
        }
    }
}

type SnapshotFilter = Arc<dyn Fn(&TodoSnapshot) -> bool + Send + Sync>;

/// Ordering and selection applied by `get_items`.
///
/// Items are sorted by priority, optionally with completed items after open
/// ones; then filtered; then truncated to `count`.
#[derive(Clone, Default)]
pub struct ItemQuery {
    pub completed_items_last: bool,
    pub count: Option<usize>,
    pub filter: Option<SnapshotFilter>,
}

impl fmt::Debug for ItemQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemQuery")
            .field("completed_items_last", &self.completed_items_last)
            .field("count", &self.count)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_last(mut self, completed_items_last: bool) -> Self {
        self.completed_items_last = completed_items_last;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn filter(mut self, filter: impl Fn(&TodoSnapshot) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Open items only.
    pub fn open() -> Self {
        Self::new().filter(|item| !item.completed)
    }

    /// Completed items only.
    pub fn completed() -> Self {
        Self::new().filter(|item| item.completed)
    }

    fn compare(&self, a: &TodoSnapshot, b: &TodoSnapshot) -> Ordering {
        if self.completed_items_last && a.completed != b.completed {
            return a.completed.cmp(&b.completed);
        }
        a.priority.cmp(&b.priority)
    }

    /// Apply the query to `items`, using `snapshot` to read each one.
    /// The sort is stable, so equal priorities keep their input order.
    pub fn select<I>(&self, items: Vec<I>, snapshot: impl Fn(&I) -> TodoSnapshot) -> Vec<I> {
        let mut keyed: Vec<(TodoSnapshot, I)> = items
            .into_iter()
            .map(|item| (snapshot(&item), item))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));
        keyed
            .into_iter()
            .filter(|(view, _)| self.filter.as_ref().map_or(true, |keep| keep(view)))
            .take(self.count.unwrap_or(usize::MAX))
            .map(|(_, item)| item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn snapshot(id: ItemId, priority: u32, completed: bool) -> TodoSnapshot {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TodoSnapshot {
            id,
            action: format!("item {id}"),
            priority,
            completed,
            date_created: created,
            date_completed: completed.then(|| created + Duration::hours(2)),
        }
    }

    fn ids(items: &[TodoSnapshot]) -> Vec<ItemId> {
        items.iter().map(|item| item.id).collect()
    }

    #[test]
    fn sorts_by_priority() {
        let items = vec![snapshot(0, 3, false), snapshot(1, 1, true), snapshot(2, 2, false)];
        let sorted = ItemQuery::new().select(items, Clone::clone);
        assert_eq!(ids(&sorted), vec![1, 2, 0]);
    }

    #[test]
    fn completed_last_then_filter_then_count() {
        let items = vec![
            snapshot(0, 3, false),
            snapshot(1, 1, true),
            snapshot(2, 2, false),
            snapshot(3, 0, false),
        ];

        let ordered = ItemQuery::new().completed_last(true).select(items.clone(), Clone::clone);
        assert_eq!(ids(&ordered), vec![3, 2, 0, 1]);

        let top = ItemQuery::open().count(2).select(items, Clone::clone);
        assert_eq!(ids(&top), vec![3, 2]);
    }

    #[test]
    fn completion_time_only_for_completed() {
        assert_eq!(snapshot(0, 0, true).completion_time(), Some(Duration::hours(2)));
        assert_eq!(snapshot(0, 0, false).completion_time(), None);
    }
}
