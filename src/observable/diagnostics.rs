//! Reporting channel for subscriber failures.
//!
//! Dispatch never lets a failing subscriber reach the code that triggered the
//! notification. Failures are handed to a [`DiagnosticSink`] instead, which is
//! injected when the notifier is constructed.

use parking_lot::Mutex;

/// How a subscriber failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The callback returned `Err`.
    Error,
    /// The callback panicked.
    Panic,
}

/// A single swallowed subscriber failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    /// Action tag of the notification being dispatched.
    pub action: String,
    pub kind: FailureKind,
    /// Rendered error or panic payload.
    pub message: String,
}

/// Receives subscriber failures caught during dispatch.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, failure: SubscriberFailure);
}

/// Default sink: logs each failure at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, failure: SubscriberFailure) {
        tracing::warn!(
            action = %failure.action,
            kind = ?failure.kind,
            "Subscriber failed: {}",
            failure.message
        );
    }
}

/// Sink that keeps every failure in memory (and still logs it).
#[derive(Debug, Default)]
pub struct RecordingSink {
    failures: Mutex<Vec<SubscriberFailure>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures recorded so far, oldest first.
    pub fn failures(&self) -> Vec<SubscriberFailure> {
        self.failures.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, failure: SubscriberFailure) {
        TracingSink.report(failure.clone());
        self.failures.lock().push(failure);
    }
}
