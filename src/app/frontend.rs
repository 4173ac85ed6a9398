use crate::config::Strategy;
use crate::stats::RenderStats;
use crate::todo::{ItemId, StoreError, TodoSnapshot};

/// One state-management strategy driving the to-do views.
///
/// Both implementations keep the same list semantics; they differ in how
/// much of the screen each change repaints, which the render counts show.
pub trait Frontend {
    fn strategy(&self) -> Strategy;

    /// Add an open item at the bottom. Returns its id.
    fn add(&mut self, action: &str) -> ItemId;

    /// Flip completion. Returns the new state.
    fn toggle(&mut self, id: ItemId) -> Result<bool, StoreError>;

    fn rename(&mut self, id: ItemId, action: &str) -> Result<(), StoreError>;

    /// Move `distance` places in priority order, negative = up.
    fn move_item(&mut self, id: ItemId, distance: i64) -> Result<(), StoreError>;

    /// Returns how many of `ids` existed.
    fn delete(&mut self, ids: &[ItemId]) -> usize;

    /// Delete every completed item. Returns how many went.
    fn purge(&mut self) -> usize;

    /// Flip completed-items-last. Returns the new setting.
    fn toggle_order(&mut self) -> bool;

    /// Items in display order.
    fn items(&self) -> Vec<TodoSnapshot>;

    fn render_stats(&self) -> &RenderStats;

    /// Current screen text.
    fn screen(&self) -> String;
}
