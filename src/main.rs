use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use todo_lab::app;
use todo_lab::config::{Config, Strategy};
use todo_lab::logging::init_tracing;
use todo_lab::time::SystemClock;

/// Interactive to-do list driven by observables or by a reducer.
#[derive(Debug, Parser)]
#[command(name = "todo-lab", version, about)]
struct Cli {
    /// State-management strategy (overrides `[app] strategy`).
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Config file to use instead of the default location.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show completed items after open ones.
    #[arg(long)]
    completed_last: bool,

    /// Start with an empty list instead of the demo items.
    #[arg(long)]
    no_seed: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(strategy) = self.strategy {
            config.app.strategy = strategy;
        }
        if self.completed_last {
            config.list.completed_items_last = true;
        }
        if self.no_seed {
            config.list.seed_defaults = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    cli.apply(&mut config);
    tracing::info!(?config, "Configuration loaded");

    let mut frontend = app::build_frontend(&config, Arc::new(SystemClock));
    app::run(frontend.as_mut(), io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
