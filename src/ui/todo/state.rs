use crate::todo::{ItemId, ItemQuery, TodoSnapshot};
use crate::ui::mvi::UiState;

/// Whole to-do list as one immutable value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TodoListState {
    /// Items in insertion order.
    pub items: Vec<TodoSnapshot>,
    pub next_id: ItemId,
    pub next_priority: u32,
    pub completed_items_last: bool,
}

impl UiState for TodoListState {}

impl TodoListState {
    /// State holding `items`, with counters continuing after them.
    pub fn with_items(items: Vec<TodoSnapshot>) -> Self {
        let next_id = items.iter().map(|item| item.id + 1).max().unwrap_or(0);
        let next_priority = items.iter().map(|item| item.priority + 1).max().unwrap_or(0);
        Self {
            items,
            next_id,
            next_priority,
            completed_items_last: false,
        }
    }

    pub fn get_item(&self, id: ItemId) -> Option<&TodoSnapshot> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_items(&self, query: &ItemQuery) -> Vec<TodoSnapshot> {
        query.select(self.items.clone(), Clone::clone)
    }

    /// Items in display order.
    pub fn visible_items(&self) -> Vec<TodoSnapshot> {
        self.get_items(&ItemQuery::new().completed_last(self.completed_items_last))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.completed).count()
    }
}
