//! Capability interface shared by every observable container.
//!
//! A [`Source`] is what a binding subscribes to. Action tags cross this
//! boundary as strings, so a binding can name a tag without knowing the
//! container's concrete tag type.

use std::marker::PhantomData;
use std::sync::Arc;

use super::array::{ArrayAction, ArrayEvent, ObservableArray, ReadonlyObservableArray, WeakObservableArray};
use super::notifier::{ActionTag, Observable, Subscriber, Subscription};
use super::object::{ObjectAction, ObjectEvent, ObservableObject};
use super::value::{ObservableValue, ValueAction};

/// Stable identity of a source. Equal for every handle to the same storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

/// Callback receiving `(value, action tag)` for each accepted notification.
pub type SourceHandler<V> = Arc<dyn Fn(&V, &str) + Send + Sync>;

pub trait Source<V>: Send + Sync {
    fn id(&self) -> SourceId;

    /// Current value, for sources that hold one. Plain notifiers return
    /// `None`; their dispatched value is all there is.
    fn snapshot(&self) -> Option<V>;

    /// Register `handler` for `action` (`None` = every action). An action
    /// name the source does not publish yields an inert subscription.
    fn watch(&self, action: Option<&str>, handler: SourceHandler<V>) -> Subscription;
}

/// Resolve a textual tag to the container's tag type. The outer `None`
/// means the name is not a tag of `A`.
fn resolve<A: ActionTag>(action: Option<&str>) -> Option<Option<A>> {
    match action {
        None => Some(None),
        Some(name) => match A::from_tag(name) {
            Some(tag) => Some(Some(tag)),
            None => {
                tracing::warn!(action = name, "Unknown action for source, binding stays inert");
                None
            }
        },
    }
}

impl<T, A> Source<T> for Observable<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: ActionTag,
{
    fn id(&self) -> SourceId {
        SourceId(self.identity())
    }

    fn snapshot(&self) -> Option<T> {
        None
    }

    fn watch(&self, action: Option<&str>, handler: SourceHandler<T>) -> Subscription {
        let Some(action) = resolve::<A>(action) else {
            return Subscription::inert();
        };
        let subscriber = Subscriber::new(move |value: &T, tag: &A| handler(value, tag.as_str()));
        self.subscribe(&subscriber, action)
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for ObservableValue<T> {
    fn id(&self) -> SourceId {
        SourceId(self.identity())
    }

    fn snapshot(&self) -> Option<T> {
        Some(self.read())
    }

    fn watch(&self, action: Option<&str>, handler: SourceHandler<T>) -> Subscription {
        let Some(action) = resolve::<ValueAction>(action) else {
            return Subscription::inert();
        };
        let subscriber =
            Subscriber::new(move |value: &T, tag: &ValueAction| handler(value, tag.as_str()));
        self.subscribe(&subscriber, action)
    }
}

/// Arrays dispatch their current items, not the structural event.
fn watch_array<T: Clone + Send + Sync + 'static>(
    weak: WeakObservableArray<T>,
    action: Option<&str>,
    handler: SourceHandler<Vec<T>>,
    subscribe: impl FnOnce(&Subscriber<ArrayEvent<T>, ArrayAction>, Option<ArrayAction>) -> Subscription,
) -> Subscription {
    let Some(action) = resolve::<ArrayAction>(action) else {
        return Subscription::inert();
    };
    let subscriber = Subscriber::new(move |_: &ArrayEvent<T>, tag: &ArrayAction| {
        if let Some(items) = weak.items() {
            handler(&items, tag.as_str());
        }
    });
    subscribe(&subscriber, action)
}

impl<T: Clone + Send + Sync + 'static> Source<Vec<T>> for ObservableArray<T> {
    fn id(&self) -> SourceId {
        SourceId(self.identity())
    }

    fn snapshot(&self) -> Option<Vec<T>> {
        Some(self.items())
    }

    fn watch(&self, action: Option<&str>, handler: SourceHandler<Vec<T>>) -> Subscription {
        watch_array(self.downgrade(), action, handler, |subscriber, action| {
            self.subscribe(subscriber, action)
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Source<Vec<T>> for ReadonlyObservableArray<T> {
    fn id(&self) -> SourceId {
        SourceId(self.identity())
    }

    fn snapshot(&self) -> Option<Vec<T>> {
        Some(self.items())
    }

    fn watch(&self, action: Option<&str>, handler: SourceHandler<Vec<T>>) -> Subscription {
        watch_array(self.downgrade(), action, handler, |subscriber, action| {
            self.subscribe(subscriber, action)
        })
    }
}

/// Objects have no single current value; bindings see each event.
impl<V: Clone + Send + Sync + 'static> Source<ObjectEvent<V>> for ObservableObject<V> {
    fn id(&self) -> SourceId {
        SourceId(self.identity())
    }

    fn snapshot(&self) -> Option<ObjectEvent<V>> {
        None
    }

    fn watch(&self, action: Option<&str>, handler: SourceHandler<ObjectEvent<V>>) -> Subscription {
        let Some(action) = resolve::<ObjectAction>(action) else {
            return Subscription::inert();
        };
        let subscriber = Subscriber::new(move |event: &ObjectEvent<V>, tag: &ObjectAction| {
            handler(event, tag.as_str())
        });
        self.subscribe(&subscriber, action)
    }
}

/// A source viewed through a projection, so containers of different value
/// types can feed one binding.
///
/// Identity belongs to the adapter, not the wrapped source: building a new
/// adapter each update makes the binding resubscribe.
pub struct Mapped<S, F, V> {
    source: S,
    project: Arc<F>,
    _input: PhantomData<fn(&V)>,
}

impl<S, F, V> Mapped<S, F, V> {
    pub fn new<U>(source: S, project: F) -> Self
    where
        S: Source<V>,
        F: Fn(&V) -> U,
    {
        Self {
            source,
            project: Arc::new(project),
            _input: PhantomData,
        }
    }
}

impl<S, F, V, U> Source<U> for Mapped<S, F, V>
where
    S: Source<V>,
    F: Fn(&V) -> U + Send + Sync + 'static,
    V: 'static,
    U: 'static,
{
    fn id(&self) -> SourceId {
        SourceId(Arc::as_ptr(&self.project).cast::<()>() as usize)
    }

    fn snapshot(&self) -> Option<U> {
        self.source.snapshot().map(|value| (self.project)(&value))
    }

    fn watch(&self, action: Option<&str>, handler: SourceHandler<U>) -> Subscription {
        let project = Arc::clone(&self.project);
        self.source.watch(
            action,
            Arc::new(move |value: &V, tag: &str| handler(&project(value), tag)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collector<V: Clone + Send + Sync + 'static>() -> (Arc<Mutex<Vec<(V, String)>>>, SourceHandler<V>) {
        let log: Arc<Mutex<Vec<(V, String)>>> = Arc::default();
        let sink = Arc::clone(&log);
        let handler: SourceHandler<V> = Arc::new(move |value: &V, tag: &str| {
            sink.lock().push((value.clone(), tag.to_string()));
        });
        (log, handler)
    }

    #[test]
    fn value_source_reports_set() {
        let value = ObservableValue::new(1);
        let (log, handler) = collector::<i32>();
        let _subscription = value.watch(Some("set"), handler);

        value.write(2);

        assert_eq!(*log.lock(), vec![(2, "set".to_string())]);
        assert_eq!(Source::snapshot(&value), Some(2));
    }

    #[test]
    fn unknown_action_is_inert() {
        let value = ObservableValue::new(1);
        let (log, handler) = collector::<i32>();
        let subscription = value.watch(Some("push"), handler);

        value.write(2);

        assert!(subscription.is_inert());
        assert!(log.lock().is_empty());
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn array_source_dispatches_items() {
        let array = ObservableArray::new(vec![1]);
        let (log, handler) = collector::<Vec<i32>>();
        let _subscription = array.readonly().watch(None, handler);

        array.push([2]);

        assert_eq!(*log.lock(), vec![(vec![1, 2], "push".to_string())]);
        assert_eq!(array.id(), array.readonly().id());
    }

    #[test]
    fn mapped_source_projects_values() {
        let value = ObservableValue::new(3);
        let mapped = Mapped::new(value.clone(), |n: &i32| n.to_string());
        let (log, handler) = collector::<String>();
        let _subscription = mapped.watch(None, handler);

        value.write(4);

        assert_eq!(mapped.snapshot(), Some("4".to_string()));
        assert_eq!(*log.lock(), vec![("4".to_string(), "set".to_string())]);
        assert_ne!(mapped.id(), value.id());
    }

    #[test]
    fn plain_notifier_has_no_snapshot() {
        let observable: Observable<i32> = Observable::new();
        let (log, handler) = collector::<i32>();
        let _subscription = observable.watch(Some("tick"), handler);

        observable.notify(9, "tick".to_string());

        assert_eq!(Source::snapshot(&observable), None);
        assert_eq!(*log.lock(), vec![(9, "tick".to_string())]);
    }
}
