//! Reducer strategy: the to-do list as immutable state driven by intents.

pub mod mvi;
pub mod todo;
