//! Reducer-driven front-end: one immutable state, every effective intent
//! repaints the whole screen.

use std::sync::Arc;

use super::frontend::Frontend;
use super::view::{self, component, Screen};
use crate::config::{Config, StatsConfig, Strategy};
use crate::stats::RenderStats;
use crate::time::Clock;
use crate::todo::{default_items, ItemId, ItemQuery, StoreError, TodoSnapshot};
use crate::ui::mvi::Reducer;
use crate::ui::todo::{TodoIntent, TodoListState, TodoReducer};

pub struct ReducerFrontend {
    state: TodoListState,
    clock: Arc<dyn Clock>,
    screen: Screen,
    stats: RenderStats,
    settings: StatsConfig,
}

impl ReducerFrontend {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let items = if config.list.seed_defaults {
            default_items(clock.now())
        } else {
            Vec::new()
        };
        let state = TodoListState {
            completed_items_last: config.list.completed_items_last,
            ..TodoListState::with_items(items)
        };
        let frontend = Self {
            state,
            clock,
            screen: Screen::new(Strategy::Reducer.as_str()),
            stats: RenderStats::new(),
            settings: config.stats.clone(),
        };
        frontend.render();
        frontend
    }

    pub fn state(&self) -> &TodoListState {
        &self.state
    }

    /// Reduce `intent`; repaint when the state changed.
    fn dispatch(&mut self, intent: TodoIntent) {
        let next = TodoReducer::reduce(self.state.clone(), intent);
        if next == self.state {
            tracing::debug!("Intent left state unchanged, skipping render");
            return;
        }
        self.state = next;
        self.render();
    }

    fn require(&self, id: ItemId) -> Result<&TodoSnapshot, StoreError> {
        self.state.get_item(id).ok_or(StoreError::ItemNotFound(id))
    }

    fn render(&self) {
        let now = self.clock.now();
        let graduations = self.settings.duration_graduations;
        self.stats.signal_render(component::APP);

        self.stats.signal_render(component::LIST);
        let visible = self.state.visible_items();
        for item in &visible {
            self.stats.signal_render(component::ITEM);
            self.screen
                .set_row(item.id, view::item_line(item, now, graduations));
        }
        self.screen
            .set_order(visible.iter().map(|item| item.id).collect());

        self.stats.signal_render(component::STATS);
        self.screen.set_summary(view::summary_line(
            self.state.len(),
            self.state.completed_count(),
        ));

        self.stats.signal_render(component::TOP);
        let count = self.settings.top_count;
        let open = self.state.get_items(&ItemQuery::open().count(count));
        self.screen.set_top(view::top_lines(count, &open));

        self.stats.signal_render(component::AVERAGE);
        self.screen
            .set_average(view::average_line(&self.state.items, graduations));
    }
}

impl Frontend for ReducerFrontend {
    fn strategy(&self) -> Strategy {
        Strategy::Reducer
    }

    fn add(&mut self, action: &str) -> ItemId {
        let id = self.state.next_id;
        let at = self.clock.now();
        self.dispatch(TodoIntent::Add {
            action: action.to_string(),
            at,
        });
        id
    }

    fn toggle(&mut self, id: ItemId) -> Result<bool, StoreError> {
        let completed = !self.require(id)?.completed;
        let at = self.clock.now();
        self.dispatch(TodoIntent::Toggle { id, at });
        Ok(completed)
    }

    fn rename(&mut self, id: ItemId, action: &str) -> Result<(), StoreError> {
        self.require(id)?;
        self.dispatch(TodoIntent::SetAction {
            id,
            action: action.to_string(),
        });
        Ok(())
    }

    fn move_item(&mut self, id: ItemId, distance: i64) -> Result<(), StoreError> {
        self.require(id)?;
        self.dispatch(TodoIntent::Move { id, distance });
        Ok(())
    }

    fn delete(&mut self, ids: &[ItemId]) -> usize {
        let existing: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| self.state.get_item(*id).is_some())
            .collect();
        let count = existing.len();
        self.dispatch(TodoIntent::Delete { ids: existing });
        count
    }

    fn purge(&mut self) -> usize {
        let count = self.state.completed_count();
        self.dispatch(TodoIntent::DeleteAllCompleted);
        count
    }

    fn toggle_order(&mut self) -> bool {
        let completed_last = !self.state.completed_items_last;
        self.dispatch(TodoIntent::SetCompletedItemsLast(completed_last));
        completed_last
    }

    fn items(&self) -> Vec<TodoSnapshot> {
        self.state.visible_items()
    }

    fn render_stats(&self) -> &RenderStats {
        &self.stats
    }

    fn screen(&self) -> String {
        self.screen.compose(&self.stats)
    }
}
