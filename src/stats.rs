//! Per-component render counters.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared render counter. Clones count into the same table.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    counts: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one render of `component`.
    pub fn signal_render(&self, component: &str) {
        *self.counts.lock().entry(component.to_string()).or_insert(0) += 1;
        tracing::trace!(component, "Render");
    }

    /// Renders recorded for `component`, zero if it never rendered.
    pub fn num_renders(&self, component: &str) -> usize {
        self.counts.lock().get(component).copied().unwrap_or(0)
    }

    /// Every counter, ordered by component name.
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        self.counts.lock().clone()
    }
}
