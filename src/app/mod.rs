//! Interactive shell over the two state-management strategies.

pub mod command;
pub mod frontend;
pub mod observable;
pub mod reducer;
pub mod repl;
pub mod view;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, Strategy};
use crate::time::Clock;
use crate::todo::StoreError;

pub use command::{Command, CommandError};
pub use frontend::Frontend;
pub use observable::ObservableFrontend;
pub use reducer::ReducerFrontend;
pub use repl::run;
pub use view::Screen;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to export items: {0}")]
    Export(#[from] serde_json::Error),
}

/// Front-end for the configured strategy.
pub fn build_frontend(config: &Config, clock: Arc<dyn Clock>) -> Box<dyn Frontend> {
    tracing::info!(strategy = config.app.strategy.as_str(), "Starting front-end");
    match config.app.strategy {
        Strategy::Observable => Box::new(ObservableFrontend::new(config, clock)),
        Strategy::Reducer => Box::new(ReducerFrontend::new(config, clock)),
    }
}
