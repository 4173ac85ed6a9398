//! To-do domain: items with observable fields and the store that owns them.

mod item;
mod store;

pub use item::{ItemId, ItemQuery, TodoItem, TodoSnapshot};
pub use store::{default_items, StoreAction, StoreError, StoreEvent, TodoStore};
