use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use super::item::{ItemId, ItemQuery, TodoItem, TodoSnapshot};
use crate::observable::{
    ActionTag, DiagnosticSink, Observable, ObservableObject, ReadonlyObservableArray, Subscriber,
    Subscription, TracingSink,
};
use crate::time::{Clock, SystemClock};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No to-do item with id {0}")]
    ItemNotFound(ItemId),
}

/// Store-level change kinds, published after the item containers changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    AddItem,
    DeleteItem,
    MoveItem,
    ChangeItem,
}

impl ActionTag for StoreAction {
    fn as_str(&self) -> &str {
        match self {
            StoreAction::AddItem => "additem",
            StoreAction::DeleteItem => "deleteitem",
            StoreAction::MoveItem => "moveitem",
            StoreAction::ChangeItem => "changeitem",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "additem" => Some(StoreAction::AddItem),
            "deleteitem" => Some(StoreAction::DeleteItem),
            "moveitem" => Some(StoreAction::MoveItem),
            "changeitem" => Some(StoreAction::ChangeItem),
            _ => None,
        }
    }
}

/// Items a store change touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub ids: Vec<ItemId>,
}

/// Demo items: `(action, priority, completed, created days ago, hours to complete)`.
const DEFAULT_ITEMS: [(&str, u32, bool, i64, i64); 5] = [
    ("Something I really gotta do", 1, false, 1, 0),
    ("Something I probably should do", 4, false, 2, 0),
    ("Something I might wanna do", 5, false, 3, 0),
    ("Something I already did!", 2, true, 6, 26),
    ("Something I decided not to do", 3, true, 5, 3),
];

/// The demo items as snapshots dated relative to `now`, ids from zero.
pub fn default_items(now: DateTime<Utc>) -> Vec<TodoSnapshot> {
    (0..)
        .zip(DEFAULT_ITEMS)
        .map(|(id, (action, priority, completed, days_ago, hours_to_complete))| {
            let date_created = now - Duration::days(days_ago);
            TodoSnapshot {
                id,
                action: action.to_string(),
                priority,
                completed,
                date_created,
                date_completed: completed
                    .then(|| date_created + Duration::hours(hours_to_complete)),
            }
        })
        .collect()
}

#[derive(Debug)]
struct Counters {
    next_id: ItemId,
    /// Priority handed to the next new item.
    next_priority: u32,
}

struct StoreInner {
    items: ObservableObject<TodoItem>,
    events: Observable<StoreEvent, StoreAction>,
    counters: Mutex<Counters>,
    clock: Arc<dyn Clock>,
    /// Handed to every item's field notifiers.
    sink: Arc<dyn DiagnosticSink>,
}

/// Observable-backed to-do store.
///
/// Every mutation goes through the item containers first (so field bindings
/// see it) and then publishes one [`StoreEvent`] for list-level views.
#[derive(Clone)]
pub struct TodoStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("items", &self.inner.items.len())
            .field("counters", &*self.inner.counters.lock())
            .finish()
    }
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore {
    /// Empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store seeded with the demo items.
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store.seed_defaults();
        store
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::build(clock, Arc::new(TracingSink))
    }

    /// Store whose containers report subscriber failures to `sink`.
    pub fn with_clock_and_sink(clock: Arc<dyn Clock>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::build(clock, sink)
    }

    fn build(clock: Arc<dyn Clock>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                items: ObservableObject::with_sink(Arc::clone(&sink)),
                events: Observable::with_sink(Arc::clone(&sink)),
                counters: Mutex::new(Counters {
                    next_id: 0,
                    next_priority: 0,
                }),
                clock,
                sink,
            }),
        }
    }

    /// Add the five demo items, dated relative to the store's clock.
    pub fn seed_defaults(&self) {
        for seed in default_items(self.inner.clock.now()) {
            let item = {
                let mut counters = self.inner.counters.lock();
                let item = TodoItem::new(
                    counters.next_id,
                    seed.action,
                    seed.priority,
                    seed.date_created,
                    Arc::clone(&self.inner.sink),
                );
                counters.next_id += 1;
                counters.next_priority = counters.next_priority.max(seed.priority + 1);
                item
            };
            if seed.completed {
                item.date_completed.write(seed.date_completed);
                item.completed.write(true);
            }
            self.insert(item);
        }
        tracing::debug!(items = self.len(), "Seeded demo items");
    }

    fn insert(&self, item: TodoItem) {
        let id = item.id();
        self.inner.items.add(id.to_string(), item);
        self.publish(StoreAction::AddItem, vec![id]);
    }

    /// Add an open item below every existing one. Returns its id.
    pub fn add_item(&self, action: impl Into<String>) -> ItemId {
        let item = {
            let mut counters = self.inner.counters.lock();
            let item = TodoItem::new(
                counters.next_id,
                action,
                counters.next_priority,
                self.inner.clock.now(),
                Arc::clone(&self.inner.sink),
            );
            counters.next_id += 1;
            counters.next_priority += 1;
            item
        };
        let id = item.id();
        tracing::debug!(id, "Adding item");
        self.insert(item);
        id
    }

    /// Delete every listed item that exists. Returns how many were deleted.
    pub fn delete_items(&self, ids: &[ItemId]) -> usize {
        let deleted: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| self.inner.items.delete(&id.to_string()).is_some())
            .collect();
        let count = deleted.len();
        if count > 0 {
            tracing::debug!(?deleted, "Deleted items");
            self.publish(StoreAction::DeleteItem, deleted);
        }
        count
    }

    pub fn delete_all_completed(&self) -> usize {
        let completed: Vec<ItemId> = self
            .inner
            .items
            .values()
            .iter()
            .filter(|item| item.is_completed())
            .map(TodoItem::id)
            .collect();
        self.delete_items(&completed)
    }

    pub fn set_action(&self, id: ItemId, action: impl Into<String>) -> Result<(), StoreError> {
        let item = self.item(id)?;
        item.action.write(action.into());
        self.publish(StoreAction::ChangeItem, vec![id]);
        Ok(())
    }

    /// Flip completion. Completing stamps `date_completed`; reopening keeps
    /// the old stamp. Returns the new completion state.
    pub fn toggle_completed(&self, id: ItemId) -> Result<bool, StoreError> {
        let item = self.item(id)?;
        let completed = !item.is_completed();
        if completed {
            item.date_completed.write(Some(self.inner.clock.now()));
        }
        item.completed.write(completed);
        self.publish(StoreAction::ChangeItem, vec![id]);
        Ok(completed)
    }

    /// Move an item `distance` places in priority order (negative = up),
    /// clamped to the list bounds, then renumber priorities from zero.
    pub fn move_item(&self, id: ItemId, distance: i64) -> Result<(), StoreError> {
        let mut order = self.get_items(&ItemQuery::new());
        let index = order
            .iter()
            .position(|item| item.id() == id)
            .ok_or(StoreError::ItemNotFound(id))?;
        let item = order.remove(index);
        let target = (index as i64).saturating_add(distance).clamp(0, order.len() as i64) as usize;
        order.insert(target, item);

        for (priority, item) in (0u32..).zip(&order) {
            if item.priority.read() != priority {
                item.priority.write(priority);
            }
        }
        tracing::debug!(id, from = index, to = target, "Moved item");
        self.publish(StoreAction::MoveItem, vec![id]);
        Ok(())
    }

    pub fn get_item(&self, id: ItemId) -> Option<TodoItem> {
        self.inner.items.get(&id.to_string())
    }

    pub fn get_items(&self, query: &ItemQuery) -> Vec<TodoItem> {
        query.select(self.inner.items.values(), TodoItem::snapshot)
    }

    /// Snapshots of every item in priority order.
    pub fn snapshot(&self) -> Vec<TodoSnapshot> {
        self.get_items(&ItemQuery::new())
            .iter()
            .map(TodoItem::snapshot)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// Live list of item keys in insertion order.
    pub fn keys(&self) -> ReadonlyObservableArray<String> {
        self.inner.items.keys()
    }

    /// Store-level notifier.
    pub fn events(&self) -> Observable<StoreEvent, StoreAction> {
        self.inner.events.clone()
    }

    /// Convenience for `events().subscribe(..)`.
    pub fn on(
        &self,
        subscriber: &Subscriber<StoreEvent, StoreAction>,
        action: Option<StoreAction>,
    ) -> Subscription {
        self.inner.events.subscribe(subscriber, action)
    }

    fn item(&self, id: ItemId) -> Result<TodoItem, StoreError> {
        self.get_item(id).ok_or(StoreError::ItemNotFound(id))
    }

    fn publish(&self, action: StoreAction, ids: Vec<ItemId>) {
        self.inner.events.notify(StoreEvent { ids }, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use chrono::{TimeZone, Utc};

    fn store() -> (TodoStore, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        (TodoStore::with_clock(Arc::new(clock.clone())), clock)
    }

    fn actions(store: &TodoStore) -> Vec<String> {
        store.snapshot().into_iter().map(|item| item.action).collect()
    }

    #[test]
    fn defaults_are_deterministic() {
        let (store, _clock) = store();
        store.seed_defaults();

        let items = store.snapshot();
        assert_eq!(items.len(), 5);
        assert_eq!(items.iter().filter(|item| item.completed).count(), 2);
        assert_eq!(items[0].action, "Something I really gotta do");
        assert_eq!(items[1].action, "Something I already did!");
        assert_eq!(items[1].completion_time(), Some(Duration::hours(26)));

        let id = store.add_item("new");
        assert_eq!(id, 5);
        assert_eq!(store.get_item(id).map(|item| item.priority.read()), Some(6));
    }

    #[test]
    fn toggle_stamps_completion_date() {
        let (store, clock) = store();
        let id = store.add_item("write tests");
        clock.advance(Duration::hours(1));

        assert_eq!(store.toggle_completed(id), Ok(true));
        let item = store.get_item(id).unwrap().snapshot();
        assert_eq!(item.completion_time(), Some(Duration::hours(1)));

        assert_eq!(store.toggle_completed(id), Ok(false));
        assert!(store.get_item(id).unwrap().date_completed.read().is_some());
        assert_eq!(store.toggle_completed(99), Err(StoreError::ItemNotFound(99)));
    }

    #[test]
    fn move_reorders_and_renumbers() {
        let (store, _clock) = store();
        let a = store.add_item("a");
        store.add_item("b");
        store.add_item("c");

        store.move_item(a, 1).unwrap();
        assert_eq!(actions(&store), vec!["b", "a", "c"]);

        store.move_item(a, 10).unwrap();
        assert_eq!(actions(&store), vec!["b", "c", "a"]);

        store.move_item(a, -10).unwrap();
        assert_eq!(actions(&store), vec!["a", "b", "c"]);

        let priorities: Vec<u32> = store.snapshot().iter().map(|item| item.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2]);
    }

    #[test]
    fn extreme_move_distances_clamp() {
        let (store, _clock) = store();
        let a = store.add_item("a");
        store.add_item("b");
        let c = store.add_item("c");

        store.move_item(a, i64::MAX).unwrap();
        assert_eq!(actions(&store), vec!["b", "c", "a"]);

        store.move_item(c, i64::MIN).unwrap();
        assert_eq!(actions(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn delete_completed_and_events() {
        let (store, _clock) = store();
        let log: Arc<Mutex<Vec<(StoreAction, Vec<ItemId>)>>> = Arc::default();
        let subscriber = {
            let log = Arc::clone(&log);
            Subscriber::new(move |event: &StoreEvent, action: &StoreAction| {
                log.lock().push((*action, event.ids.clone()));
            })
        };
        let _subscription = store.on(&subscriber, None);

        let a = store.add_item("a");
        let b = store.add_item("b");
        store.toggle_completed(a).unwrap();
        assert_eq!(store.delete_all_completed(), 1);
        assert_eq!(store.delete_items(&[a]), 0);

        assert_eq!(actions(&store), vec!["b"]);
        assert_eq!(
            *log.lock(),
            vec![
                (StoreAction::AddItem, vec![a]),
                (StoreAction::AddItem, vec![b]),
                (StoreAction::ChangeItem, vec![a]),
                (StoreAction::DeleteItem, vec![a]),
            ]
        );
    }

    #[test]
    fn keys_follow_items() {
        let (store, _clock) = store();
        let keys = store.keys();
        let a = store.add_item("a");
        store.add_item("b");
        store.delete_items(&[a]);
        assert_eq!(keys.items(), vec!["1"]);
    }
}
