//! Compares two ways of keeping a to-do list's views current: fine-grained
//! observable bindings and a whole-state reducer.

pub mod app;
pub mod binder;
pub mod config;
pub mod logging;
pub mod observable;
pub mod stats;
pub mod time;
pub mod todo;
pub mod ui;
