//! Binder-driven front-end.
//!
//! Every component is a [`Binder`] over exactly the observables it shows:
//! item rows over their item's fields, the list over store membership and
//! ordering, each stats panel over the store events that can change it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::frontend::Frontend;
use super::view::{self, component, Screen};
use crate::binder::{Binder, Binding, BoundValues, Inputs};
use crate::config::{Config, StatsConfig, Strategy};
use crate::observable::{Mapped, ObservableValue};
use crate::stats::RenderStats;
use crate::time::Clock;
use crate::todo::{ItemId, ItemQuery, StoreError, StoreEvent, TodoItem, TodoSnapshot, TodoStore};

/// Value carried by every view binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Flag(bool),
    /// Items a store event touched.
    Ids(Vec<ItemId>),
}

/// What every view needs to paint.
#[derive(Clone)]
struct ViewContext {
    store: TodoStore,
    screen: Screen,
    stats: RenderStats,
    clock: Arc<dyn Clock>,
    settings: StatsConfig,
}

type Rows = Arc<Mutex<BTreeMap<ItemId, Binder<Cell>>>>;

pub struct ObservableFrontend {
    context: ViewContext,
    completed_last: ObservableValue<bool>,
    list: Binder<Cell>,
    panels: Vec<Binder<Cell>>,
}

impl ObservableFrontend {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let store = TodoStore::with_clock(Arc::clone(&clock));
        if config.list.seed_defaults {
            store.seed_defaults();
        }
        Self::with_store(store, config, clock)
    }

    /// Mount the views over an existing store.
    pub fn with_store(store: TodoStore, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let context = ViewContext {
            store,
            screen: Screen::new(Strategy::Observable.as_str()),
            stats: RenderStats::new(),
            clock,
            settings: config.stats.clone(),
        };
        context.stats.signal_render(component::APP);

        let completed_last = ObservableValue::new(config.list.completed_items_last);
        let list = mount_list(&context, &completed_last);
        let panels = vec![
            mount_summary(&context),
            mount_top(&context),
            mount_average(&context),
        ];
        tracing::debug!(items = context.store.len(), "Mounted observable views");

        Self {
            context,
            completed_last,
            list,
            panels,
        }
    }

    pub fn store(&self) -> &TodoStore {
        &self.context.store
    }

    /// Live subscriptions held by the list and the stats panels.
    pub fn subscription_count(&self) -> usize {
        self.list.subscription_count()
            + self
                .panels
                .iter()
                .map(Binder::subscription_count)
                .sum::<usize>()
    }
}

impl Frontend for ObservableFrontend {
    fn strategy(&self) -> Strategy {
        Strategy::Observable
    }

    fn add(&mut self, action: &str) -> ItemId {
        self.context.store.add_item(action)
    }

    fn toggle(&mut self, id: ItemId) -> Result<bool, StoreError> {
        self.context.store.toggle_completed(id)
    }

    fn rename(&mut self, id: ItemId, action: &str) -> Result<(), StoreError> {
        self.context.store.set_action(id, action)
    }

    fn move_item(&mut self, id: ItemId, distance: i64) -> Result<(), StoreError> {
        self.context.store.move_item(id, distance)
    }

    fn delete(&mut self, ids: &[ItemId]) -> usize {
        self.context.store.delete_items(ids)
    }

    fn purge(&mut self) -> usize {
        self.context.store.delete_all_completed()
    }

    fn toggle_order(&mut self) -> bool {
        let completed_last = !self.completed_last.read();
        self.completed_last.write(completed_last);
        completed_last
    }

    fn items(&self) -> Vec<TodoSnapshot> {
        let query = ItemQuery::new().completed_last(self.completed_last.read());
        self.context
            .store
            .get_items(&query)
            .iter()
            .map(TodoItem::snapshot)
            .collect()
    }

    fn render_stats(&self) -> &RenderStats {
        &self.context.stats
    }

    fn screen(&self) -> String {
        self.context.screen.compose(&self.context.stats)
    }
}

/// Store events as a binding value, accepted when `accept(action)` holds.
fn store_changes(
    store: &TodoStore,
    accept: impl Fn(&str) -> bool + Send + Sync + 'static,
) -> Binding<Cell> {
    Binding::new(Mapped::new(store.events(), |event: &StoreEvent| {
        Cell::Ids(event.ids.clone())
    }))
    .filter(move |_, action| accept(action))
}

fn touched(values: &BoundValues<Cell>) -> usize {
    match values.get("change") {
        Some(Cell::Ids(ids)) => ids.len(),
        _ => 0,
    }
}

/// The list re-renders on membership and order changes, and on item changes
/// only while completed items sort last.
fn mount_list(context: &ViewContext, completed_last: &ObservableValue<bool>) -> Binder<Cell> {
    let sorting = completed_last.clone();
    let inputs = Inputs::new()
        .bind(
            "change",
            store_changes(&context.store, move |action| {
                action != "changeitem" || sorting.read()
            }),
        )
        .bind(
            "completedLast",
            Binding::new(Mapped::new(completed_last.clone(), |flag: &bool| {
                Cell::Flag(*flag)
            })),
        );

    let rows: Rows = Arc::default();
    let context = context.clone();
    Binder::mount(inputs, move |values| {
        context.stats.signal_render(component::LIST);
        let completed_last = matches!(values.get("completedLast"), Some(Cell::Flag(true)));
        tracing::trace!(touched = touched(values), completed_last, "Rendering list");

        let items = context
            .store
            .get_items(&ItemQuery::new().completed_last(completed_last));
        let order: Vec<ItemId> = items.iter().map(TodoItem::id).collect();

        let stale: Vec<Binder<Cell>> = {
            let mut rows = rows.lock();
            let gone: Vec<ItemId> = rows.keys().copied().filter(|id| !order.contains(id)).collect();
            gone.iter().filter_map(|id| rows.remove(id)).collect()
        };
        drop(stale);

        for item in &items {
            if rows.lock().contains_key(&item.id()) {
                continue;
            }
            let row = mount_row(&context, item);
            rows.lock().insert(item.id(), row);
        }
        context.screen.set_order(order);
    })
}

/// A row repaints only when its item's text or completion changes.
fn mount_row(context: &ViewContext, item: &TodoItem) -> Binder<Cell> {
    let inputs = Inputs::new()
        .bind(
            "action",
            Binding::new(Mapped::new(item.action.clone(), |action: &String| {
                Cell::Text(action.clone())
            })),
        )
        .bind(
            "completed",
            Binding::new(Mapped::new(item.completed.clone(), |completed: &bool| {
                Cell::Flag(*completed)
            })),
        );

    let context = context.clone();
    let item = item.clone();
    Binder::mount(inputs, move |values| {
        context.stats.signal_render(component::ITEM);
        let mut snapshot = item.snapshot();
        if let Some(Cell::Text(action)) = values.get("action") {
            snapshot.action = action.clone();
        }
        if let Some(Cell::Flag(completed)) = values.get("completed") {
            snapshot.completed = *completed;
        }
        let line = view::item_line(
            &snapshot,
            context.clock.now(),
            context.settings.duration_graduations,
        );
        context.screen.set_row(item.id(), line);
    })
}

fn mount_summary(context: &ViewContext) -> Binder<Cell> {
    let inputs = Inputs::new().bind(
        "change",
        store_changes(&context.store, |action| action != "moveitem"),
    );
    let context = context.clone();
    Binder::mount(inputs, move |values| {
        context.stats.signal_render(component::STATS);
        tracing::trace!(touched = touched(values), "Rendering summary");
        let completed = context.store.get_items(&ItemQuery::completed()).len();
        context
            .screen
            .set_summary(view::summary_line(context.store.len(), completed));
    })
}

fn mount_top(context: &ViewContext) -> Binder<Cell> {
    let inputs = Inputs::new().bind("change", store_changes(&context.store, |_| true));
    let context = context.clone();
    Binder::mount(inputs, move |values| {
        context.stats.signal_render(component::TOP);
        tracing::trace!(touched = touched(values), "Rendering top tasks");
        let count = context.settings.top_count;
        let open: Vec<TodoSnapshot> = context
            .store
            .get_items(&ItemQuery::open().count(count))
            .iter()
            .map(TodoItem::snapshot)
            .collect();
        context.screen.set_top(view::top_lines(count, &open));
    })
}

/// Adding an item never changes the average, so only completion changes and
/// deletions repaint it.
fn mount_average(context: &ViewContext) -> Binder<Cell> {
    let inputs = Inputs::new().bind(
        "change",
        store_changes(&context.store, |action| {
            matches!(action, "changeitem" | "deleteitem")
        }),
    );
    let context = context.clone();
    Binder::mount(inputs, move |values| {
        context.stats.signal_render(component::AVERAGE);
        tracing::trace!(touched = touched(values), "Rendering average");
        let items = context.store.snapshot();
        context.screen.set_average(view::average_line(
            &items,
            context.settings.duration_graduations,
        ));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use chrono::{TimeZone, Utc};

    fn frontend(seed: bool) -> ObservableFrontend {
        let mut config = Config::default();
        config.list.seed_defaults = seed;
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
        ObservableFrontend::new(&config, Arc::new(clock))
    }

    fn renders(frontend: &ObservableFrontend, name: &str) -> usize {
        frontend.render_stats().num_renders(name)
    }

    #[test]
    fn mount_renders_every_component_once() {
        let frontend = frontend(true);
        assert_eq!(renders(&frontend, component::APP), 1);
        assert_eq!(renders(&frontend, component::LIST), 1);
        assert_eq!(renders(&frontend, component::ITEM), 5);
        assert_eq!(renders(&frontend, component::STATS), 1);
        assert_eq!(renders(&frontend, component::TOP), 1);
        assert_eq!(renders(&frontend, component::AVERAGE), 1);
        assert_eq!(frontend.subscription_count(), 5);
    }

    #[test]
    fn renaming_repaints_only_the_row_and_dependent_panels() {
        let mut frontend = frontend(true);
        frontend.rename(0, "Something else").unwrap();

        assert_eq!(renders(&frontend, component::ITEM), 6);
        assert_eq!(renders(&frontend, component::LIST), 1);
        assert_eq!(renders(&frontend, component::TOP), 2);
        assert!(frontend.screen().contains("#0 Something else"));
    }

    #[test]
    fn adding_does_not_repaint_existing_rows_or_average() {
        let mut frontend = frontend(true);
        let id = frontend.add("New thing");

        assert_eq!(id, 5);
        assert_eq!(renders(&frontend, component::ITEM), 6);
        assert_eq!(renders(&frontend, component::LIST), 2);
        assert_eq!(renders(&frontend, component::AVERAGE), 1);
        assert!(frontend.screen().contains("6 tasks, 2 completed"));
    }

    #[test]
    fn toggle_respects_completed_last() {
        let mut frontend = frontend(false);
        let a = frontend.add("a");
        let b = frontend.add("b");
        assert!(frontend.toggle_order());

        assert_eq!(frontend.toggle(a), Ok(true));
        let order: Vec<ItemId> = frontend.items().iter().map(|item| item.id).collect();
        assert_eq!(order, vec![b, a]);
        assert!(frontend.screen().find("#1 b").unwrap() < frontend.screen().find("#0 a").unwrap());
        assert_eq!(frontend.toggle(99), Err(StoreError::ItemNotFound(99)));
    }

    #[test]
    fn deleting_drops_row_subscriptions() {
        let mut frontend = frontend(true);
        let item = frontend.store().get_item(1).unwrap();
        assert_eq!(item.action.subscriber_count(), 1);

        assert_eq!(frontend.delete(&[1, 42]), 1);
        assert_eq!(item.action.subscriber_count(), 0);
        assert!(!frontend.screen().contains("#1 "));
        assert_eq!(frontend.purge(), 2);
        assert!(frontend.screen().contains("2 tasks, 0 completed"));
    }
}
