use chrono::{DateTime, Utc};

use crate::todo::ItemId;
use crate::ui::mvi::Intent;

#[derive(Debug, Clone, PartialEq)]
pub enum TodoIntent {
    Add { action: String, at: DateTime<Utc> },
    Delete { ids: Vec<ItemId> },
    DeleteAllCompleted,
    SetAction { id: ItemId, action: String },
    /// Flip completion; `at` stamps the completion date when completing.
    Toggle { id: ItemId, at: DateTime<Utc> },
    /// Move by `distance` places in priority order, negative = up.
    Move { id: ItemId, distance: i64 },
    SetCompletedItemsLast(bool),
}

impl Intent for TodoIntent {}
