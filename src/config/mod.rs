//! TOML configuration.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, MAX_GRADUATIONS, MAX_TOP_COUNT};
pub use types::{AppConfig, Config, ListConfig, StatsConfig, Strategy};
