//! Single observable slot.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::diagnostics::DiagnosticSink;
use super::notifier::{ActionTag, Observable, Subscriber, Subscription};

/// The only event an [`ObservableValue`] publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueAction {
    Set,
}

impl ActionTag for ValueAction {
    fn as_str(&self) -> &str {
        "set"
    }

    fn from_tag(tag: &str) -> Option<Self> {
        (tag == "set").then_some(ValueAction::Set)
    }
}

struct ValueInner<T> {
    value: RwLock<T>,
    notifier: Observable<T, ValueAction>,
}

/// A value that notifies subscribers every time it is written.
///
/// Writes are never deduplicated: writing the current value again still
/// publishes `Set`. Cloning yields another handle to the same slot.
pub struct ObservableValue<T> {
    inner: Arc<ValueInner<T>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservableValue")
            .field(&*self.inner.value.read())
            .finish()
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for ObservableValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableValue<T> {
    pub fn new(value: T) -> Self {
        Self::from_notifier(value, Observable::new())
    }

    /// Create a value whose subscriber failures go to `sink`.
    pub fn with_sink(value: T, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::from_notifier(value, Observable::with_sink(sink))
    }

    fn from_notifier(value: T, notifier: Observable<T, ValueAction>) -> Self {
        Self {
            inner: Arc::new(ValueInner {
                value: RwLock::new(value),
                notifier,
            }),
        }
    }

    /// Current value.
    pub fn read(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value and publish `(value, Set)`.
    pub fn write(&self, value: T) {
        *self.inner.value.write() = value.clone();
        self.inner.notifier.notify(value, ValueAction::Set);
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.write(next);
    }

    pub fn subscribe(
        &self,
        subscriber: &Subscriber<T, ValueAction>,
        action: Option<ValueAction>,
    ) -> Subscription {
        self.inner.notifier.subscribe(subscriber, action)
    }

    pub fn unsubscribe(
        &self,
        subscriber: &Subscriber<T, ValueAction>,
        action: Option<ValueAction>,
    ) -> bool {
        self.inner.notifier.unsubscribe(subscriber, action)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier.subscriber_count()
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }
}

/// A container paired with a flag telling consumers when its initial
/// contents have been populated.
#[derive(Debug, Clone)]
pub struct Readyable<C> {
    pub container: C,
    pub ready: ObservableValue<bool>,
}

impl<C> Readyable<C> {
    pub fn new(container: C, ready: bool) -> Self {
        Self {
            container,
            ready: ObservableValue::new(ready),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.read()
    }

    /// Flip the flag to ready. Publishes `Set` only on the first call.
    pub fn mark_ready(&self) {
        if !self.ready.read() {
            self.ready.write(true);
        }
    }
}
