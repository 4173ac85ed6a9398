use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// How the to-do list starts and is ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Show completed items after open ones (default: false).
    #[serde(default)]
    pub completed_items_last: bool,
    /// Start with the demo items (default: true).
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
}

/// Stats panel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Number of open tasks listed as top tasks (default: 3).
    #[serde(default = "default_top_count")]
    pub top_count: usize,
    /// Units used when printing the average completion time (default: 2).
    #[serde(default = "default_duration_graduations")]
    pub duration_graduations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub strategy: Strategy,
}

/// State-management strategy driving the views.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Observable containers with per-view bindings.
    #[default]
    Observable,
    /// Immutable state, reducer, full re-render per intent.
    Reducer,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Observable => "observable",
            Strategy::Reducer => "reducer",
        }
    }
}

fn default_seed_defaults() -> bool {
    true
}

fn default_top_count() -> usize {
    3
}

fn default_duration_graduations() -> usize {
    2
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            completed_items_last: false,
            seed_defaults: default_seed_defaults(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_count: default_top_count(),
            duration_graduations: default_duration_graduations(),
        }
    }
}
