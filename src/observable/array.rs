//! Observable sequence with structural change events and live derived views.
//!
//! Every mutation publishes exactly one [`ArrayEvent`] tagged with an
//! [`ArrayAction`]. `map`, `filter` and `slice` return new arrays that follow
//! the source: additions at either end are applied incrementally, `pop` is
//! mirrored, anything else rebuilds the view from the source's current items.
//! Views hold the source storage weakly, so the source owns its views and not
//! the other way round.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;

use super::diagnostics::DiagnosticSink;
use super::notifier::{ActionTag, Observable, Subscriber, Subscription};

/// Kinds of change an [`ObservableArray`] publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayAction {
    Change,
    Push,
    Pop,
    Splice,
    RemoveAll,
    Sort,
    Unshift,
}

impl ActionTag for ArrayAction {
    fn as_str(&self) -> &str {
        match self {
            ArrayAction::Change => "change",
            ArrayAction::Push => "push",
            ArrayAction::Pop => "pop",
            ArrayAction::Splice => "splice",
            ArrayAction::RemoveAll => "removeAll",
            ArrayAction::Sort => "sort",
            ArrayAction::Unshift => "unshift",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "change" => Some(ArrayAction::Change),
            "push" => Some(ArrayAction::Push),
            "pop" => Some(ArrayAction::Pop),
            "splice" => Some(ArrayAction::Splice),
            "removeAll" => Some(ArrayAction::RemoveAll),
            "sort" => Some(ArrayAction::Sort),
            "unshift" => Some(ArrayAction::Unshift),
            _ => None,
        }
    }
}

/// Payload of an array notification. Lists that do not apply to the action
/// are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayEvent<T> {
    /// Index at which the operation started.
    pub index: usize,
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub changed: Vec<T>,
}

impl<T> ArrayEvent<T> {
    fn at(index: usize) -> Self {
        Self {
            index,
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
        }
    }
}

/// Index errors raised by positional mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArrayError {
    #[error("Index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Range {start}..{end} out of range for array of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
}

struct ArrayInner<T> {
    items: RwLock<Vec<T>>,
    notifier: Observable<ArrayEvent<T>, ArrayAction>,
}

/// Mutable observable sequence. Cloning yields another handle to the same
/// storage.
pub struct ObservableArray<T> {
    inner: Arc<ArrayInner<T>>,
}

impl<T> Clone for ObservableArray<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservableArray")
            .field(&*self.inner.items.read())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for ObservableArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableArray<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::from_notifier(items, Observable::new())
    }

    /// Create an array whose subscriber failures go to `sink`.
    pub fn with_sink(items: Vec<T>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::from_notifier(items, Observable::with_sink(sink))
    }

    fn from_notifier(items: Vec<T>, notifier: Observable<ArrayEvent<T>, ArrayAction>) -> Self {
        Self {
            inner: Arc::new(ArrayInner {
                items: RwLock::new(items),
                notifier,
            }),
        }
    }

    // =========================================================================
    // READING
    // =========================================================================

    /// Copy of the current items.
    pub fn items(&self) -> Vec<T> {
        self.inner.items.read().clone()
    }

    /// Run `f` against the current items without copying them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.items.read())
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.read().get(index).cloned()
    }

    /// Index of the first item matching `predicate`.
    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.inner.items.read().iter().position(predicate)
    }

    /// Read-only handle to this array.
    pub fn readonly(&self) -> ReadonlyObservableArray<T> {
        ReadonlyObservableArray {
            array: self.clone(),
        }
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Append items. Publishes `Push` with `index` = previous length.
    /// Returns the number of items added; nothing is published for none.
    pub fn push(&self, items: impl IntoIterator<Item = T>) -> usize {
        let added: Vec<T> = items.into_iter().collect();
        if added.is_empty() {
            return 0;
        }
        let index = {
            let mut items = self.inner.items.write();
            let index = items.len();
            items.extend(added.iter().cloned());
            index
        };
        let count = added.len();
        self.publish(
            ArrayEvent {
                added,
                ..ArrayEvent::at(index)
            },
            ArrayAction::Push,
        );
        count
    }

    /// Remove the last item. Publishes `Pop` with `index` = new length.
    pub fn pop(&self) -> Option<T> {
        let (item, index) = {
            let mut items = self.inner.items.write();
            let item = items.pop()?;
            (item, items.len())
        };
        self.publish(
            ArrayEvent {
                removed: vec![item.clone()],
                ..ArrayEvent::at(index)
            },
            ArrayAction::Pop,
        );
        Some(item)
    }

    /// Remove up to `delete_count` items at `start` and insert `items` there.
    /// Returns the removed items.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>, ArrayError> {
        let added: Vec<T> = items.into_iter().collect();
        let removed = self.splice_items(start, delete_count, &added)?;
        self.publish(
            ArrayEvent {
                added,
                removed: removed.clone(),
                ..ArrayEvent::at(start)
            },
            ArrayAction::Splice,
        );
        Ok(removed)
    }

    /// Insert items at the front. Publishes `Unshift`, not `Splice`.
    pub fn unshift(&self, items: impl IntoIterator<Item = T>) -> usize {
        let added: Vec<T> = items.into_iter().collect();
        if added.is_empty() {
            return 0;
        }
        {
            let mut items = self.inner.items.write();
            items.splice(0..0, added.iter().cloned());
        }
        let count = added.len();
        self.publish(
            ArrayEvent {
                added,
                ..ArrayEvent::at(0)
            },
            ArrayAction::Unshift,
        );
        count
    }

    /// Overwrite `items.len()` elements starting at `start` without
    /// resizing. Publishes `Change`.
    pub fn change(&self, start: usize, items: Vec<T>) -> Result<usize, ArrayError> {
        {
            let mut current = self.inner.items.write();
            let end = match start.checked_add(items.len()) {
                Some(end) if end <= current.len() => end,
                _ => {
                    return Err(ArrayError::RangeOutOfBounds {
                        start,
                        end: start.saturating_add(items.len()),
                        len: current.len(),
                    });
                }
            };
            current[start..end].clone_from_slice(&items);
        }
        let count = items.len();
        self.publish(
            ArrayEvent {
                changed: items,
                ..ArrayEvent::at(start)
            },
            ArrayAction::Change,
        );
        Ok(count)
    }

    /// Remove every item matching `predicate`, keeping the survivors' order.
    /// Publishes `RemoveAll` unless nothing matched.
    pub fn remove_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<T> {
        let removed = {
            let mut items = self.inner.items.write();
            let (removed, kept): (Vec<T>, Vec<T>) = items.drain(..).partition(|item| predicate(item));
            *items = kept;
            removed
        };
        if !removed.is_empty() {
            self.publish(
                ArrayEvent {
                    removed: removed.clone(),
                    ..ArrayEvent::at(0)
                },
                ArrayAction::RemoveAll,
            );
        }
        removed
    }

    /// `remove_where` when a predicate is given, `clear` otherwise.
    pub fn remove_all(&self, predicate: Option<&dyn Fn(&T) -> bool>) -> Vec<T> {
        match predicate {
            Some(predicate) => self.remove_where(predicate),
            None => self.clear(),
        }
    }

    /// Remove every item. Publishes `RemoveAll` unless already empty.
    pub fn clear(&self) -> Vec<T> {
        self.remove_where(|_| true)
    }

    /// Stable in-place sort. Publishes `Sort`.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.inner.items.write().sort_by(compare);
        self.publish(ArrayEvent::at(0), ArrayAction::Sort);
    }

    /// Replace the whole sequence. Publishes `Splice` with the old items as
    /// `removed` and the new ones as `added`.
    pub fn replace_all(&self, items: Vec<T>) {
        let removed = std::mem::replace(&mut *self.inner.items.write(), items.clone());
        self.publish(
            ArrayEvent {
                added: items,
                removed,
                ..ArrayEvent::at(0)
            },
            ArrayAction::Splice,
        );
    }

    // =========================================================================
    // SUBSCRIPTION
    // =========================================================================

    pub fn subscribe(
        &self,
        subscriber: &Subscriber<ArrayEvent<T>, ArrayAction>,
        action: Option<ArrayAction>,
    ) -> Subscription {
        self.inner.notifier.subscribe(subscriber, action)
    }

    pub fn unsubscribe(
        &self,
        subscriber: &Subscriber<ArrayEvent<T>, ArrayAction>,
        action: Option<ArrayAction>,
    ) -> bool {
        self.inner.notifier.unsubscribe(subscriber, action)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier.subscriber_count()
    }

    // =========================================================================
    // DERIVED VIEWS
    // =========================================================================

    /// Live view of `f` applied to every item.
    pub fn map<U, F>(&self, f: F) -> ObservableArray<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let view = self.derived(self.with_items(|items| items.iter().map(&f).collect()));
        let target = view.clone();
        let source = self.downgrade();
        let seen = AtomicUsize::new(self.len());
        self.follow(move |event, action| {
            let Some(items) = source.items() else {
                return;
            };
            let before = seen.swap(items.len(), atomic::Ordering::SeqCst);
            if !in_sequence(event, *action, before, items.len()) {
                target.replace_all(items.iter().map(&f).collect());
                return;
            }
            match action {
                ArrayAction::Push => {
                    target.push(event.added.iter().map(&f));
                }
                ArrayAction::Unshift => {
                    target.unshift(event.added.iter().map(&f));
                }
                ArrayAction::Pop => {
                    target.pop();
                }
                _ => target.replace_all(items.iter().map(&f).collect()),
            }
        });
        view
    }

    /// Live view of the items matching `predicate`.
    pub fn filter<P>(&self, predicate: P) -> ObservableArray<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let view = self.derived(self.with_items(|items| {
            items.iter().filter(|item| predicate(item)).cloned().collect()
        }));
        let target = view.clone();
        let source = self.downgrade();
        let seen = AtomicUsize::new(self.len());
        self.follow(move |event, action| {
            let Some(items) = source.items() else {
                return;
            };
            let before = seen.swap(items.len(), atomic::Ordering::SeqCst);
            if !in_sequence(event, *action, before, items.len()) {
                target.replace_all(items.into_iter().filter(|item| predicate(item)).collect());
                return;
            }
            match action {
                ArrayAction::Push => {
                    target.push(event.added.iter().filter(|item| predicate(item)).cloned());
                }
                ArrayAction::Unshift => {
                    target.unshift(event.added.iter().filter(|item| predicate(item)).cloned());
                }
                ArrayAction::Pop => {
                    if event.removed.first().is_some_and(|item| predicate(item)) {
                        target.pop();
                    }
                }
                _ => target.replace_all(items.into_iter().filter(|item| predicate(item)).collect()),
            }
        });
        view
    }

    /// Live view of up to `count` items starting at `start`.
    pub fn slice(&self, start: usize, count: usize) -> ObservableArray<T> {
        let window = move |items: &[T]| -> Vec<T> {
            items.iter().skip(start).take(count).cloned().collect()
        };
        let view = self.derived(self.with_items(window));
        let target = view.clone();
        let source = self.downgrade();
        self.follow(move |_, _| {
            if let Some(items) = source.items() {
                target.replace_all(window(&items));
            }
        });
        view
    }

    fn derived<U: Clone + Send + Sync + 'static>(&self, items: Vec<U>) -> ObservableArray<U> {
        ObservableArray::with_sink(items, self.inner.notifier.sink())
    }

    pub(crate) fn downgrade(&self) -> WeakObservableArray<T> {
        WeakObservableArray(Arc::downgrade(&self.inner))
    }

    /// Subscribe a view updater for the lifetime of this array.
    fn follow<F>(&self, update: F)
    where
        F: Fn(&ArrayEvent<T>, &ArrayAction) + Send + Sync + 'static,
    {
        self.subscribe(&Subscriber::new(update), None);
    }

    fn splice_items(&self, start: usize, delete_count: usize, added: &[T]) -> Result<Vec<T>, ArrayError> {
        let mut items = self.inner.items.write();
        let len = items.len();
        if start > len {
            return Err(ArrayError::IndexOutOfRange { index: start, len });
        }
        let end = start + delete_count.min(len - start);
        Ok(items.splice(start..end, added.iter().cloned()).collect())
    }

    fn publish(&self, event: ArrayEvent<T>, action: ArrayAction) {
        tracing::trace!(action = action.as_str(), index = event.index, "Array mutated");
        self.inner.notifier.notify(event, action);
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }
}

/// Whether `event` is the only change since the source had `before` items,
/// so a view can apply it incrementally. Events reordered by re-entrant
/// mutation fail this and make the view rebuild.
fn in_sequence<T>(event: &ArrayEvent<T>, action: ArrayAction, before: usize, now: usize) -> bool {
    match action {
        ArrayAction::Push => event.index == before && now == before + event.added.len(),
        ArrayAction::Unshift => now == before + event.added.len(),
        ArrayAction::Pop => event.index + 1 == before && now == event.index,
        _ => true,
    }
}

/// Non-owning handle used by views and bindings that must not keep the
/// source alive.
pub(crate) struct WeakObservableArray<T>(Weak<ArrayInner<T>>);

impl<T: Clone> WeakObservableArray<T> {
    /// Current items, or `None` once the array is gone.
    pub(crate) fn items(&self) -> Option<Vec<T>> {
        self.0.upgrade().map(|inner| inner.items.read().clone())
    }
}

/// Read-only handle to an [`ObservableArray`]: observe and derive, never
/// mutate.
pub struct ReadonlyObservableArray<T> {
    array: ObservableArray<T>,
}

impl<T> Clone for ReadonlyObservableArray<T> {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadonlyObservableArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadonlyObservableArray")
            .field(&*self.array.inner.items.read())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> ReadonlyObservableArray<T> {
    pub fn items(&self) -> Vec<T> {
        self.array.items()
    }

    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.array.with_items(f)
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.array.get(index)
    }

    pub fn subscribe(
        &self,
        subscriber: &Subscriber<ArrayEvent<T>, ArrayAction>,
        action: Option<ArrayAction>,
    ) -> Subscription {
        self.array.subscribe(subscriber, action)
    }

    pub fn unsubscribe(
        &self,
        subscriber: &Subscriber<ArrayEvent<T>, ArrayAction>,
        action: Option<ArrayAction>,
    ) -> bool {
        self.array.unsubscribe(subscriber, action)
    }

    pub fn map<U, F>(&self, f: F) -> ObservableArray<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.array.map(f)
    }

    pub fn filter<P>(&self, predicate: P) -> ObservableArray<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.array.filter(predicate)
    }

    pub fn slice(&self, start: usize, count: usize) -> ObservableArray<T> {
        self.array.slice(start, count)
    }

    pub(crate) fn identity(&self) -> usize {
        self.array.identity()
    }

    pub(crate) fn downgrade(&self) -> WeakObservableArray<T> {
        self.array.downgrade()
    }
}
