//! The publish/subscribe primitive underneath every observable container.
//!
//! Subscribers register under an optional action tag (`None` = every action).
//! Dispatch is synchronous: `notify` returns only after every matching
//! subscriber ran. Dispatch works on a snapshot of the subscriber lists and
//! holds no lock while callbacks run, so callbacks may subscribe, unsubscribe
//! or mutate the container they observe. Those changes apply to the next
//! notification only.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use super::diagnostics::{DiagnosticSink, FailureKind, SubscriberFailure, TracingSink};

/// Label identifying the kind of change an event represents.
///
/// Containers use small enums; ad-hoc notifiers can use `String`.
pub trait ActionTag: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable textual name of the tag.
    fn as_str(&self) -> &str;

    /// Parse a textual tag. Returns `None` if the name is not a valid tag.
    fn from_tag(tag: &str) -> Option<Self>;
}

impl ActionTag for String {
    fn as_str(&self) -> &str {
        &self[..]
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Some(tag.to_string())
    }
}

/// Result type returned by fallible subscriber callbacks.
pub type SubscriberResult = anyhow::Result<()>;

type Callback<T, A> = dyn Fn(&T, &A) -> SubscriberResult + Send + Sync;

/// A registered callback.
///
/// Closures have no identity, so the handle is what the notifier tracks:
/// clones of one `Subscriber` are the same subscriber, two separately
/// constructed ones are different even if they wrap identical code.
pub struct Subscriber<T, A> {
    callback: Arc<Callback<T, A>>,
}

impl<T, A> Clone for Subscriber<T, A> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T, A> fmt::Debug for Subscriber<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

impl<T: 'static, A: 'static> Subscriber<T, A> {
    /// Wrap an infallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T, &A) + Send + Sync + 'static,
    {
        let callback: Arc<Callback<T, A>> = Arc::new(move |value: &T, action: &A| {
            callback(value, action);
            Ok(())
        });
        Self { callback }
    }

    /// Wrap a callback that may fail. Errors are reported, never propagated.
    pub fn fallible<F>(callback: F) -> Self
    where
        F: Fn(&T, &A) -> SubscriberResult + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl<T, A> Subscriber<T, A> {
    /// Whether both handles refer to the same registration target.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

/// Capability returned by `subscribe`. Calling [`Subscription::unsubscribe`]
/// removes the registration; it is idempotent and harmless once the notifier
/// is gone. Dropping the handle does not unsubscribe.
#[derive(Clone, Default)]
pub struct Subscription {
    cancel: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn from_fn<F>(cancel: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Arc::new(cancel)),
        }
    }

    /// A subscription that is not attached to anything.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn is_inert(&self) -> bool {
        self.cancel.is_none()
    }

    pub fn unsubscribe(&self) {
        if let Some(cancel) = &self.cancel {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("inert", &self.is_inert())
            .finish()
    }
}

struct Registry<T, A> {
    /// `None` holds the all-actions subscribers.
    subscribers: HashMap<Option<A>, Vec<Subscriber<T, A>>>,
    /// Only allocated once something is published persistently.
    persisted: Option<Vec<(T, A)>>,
}

struct Shared<T, A> {
    registry: Mutex<Registry<T, A>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<T, A: ActionTag> Shared<T, A> {
    fn remove(&self, subscriber: &Subscriber<T, A>, action: Option<&A>) -> bool {
        let mut registry = self.registry.lock();
        let key = action.cloned();
        let Some(list) = registry.subscribers.get_mut(&key) else {
            return false;
        };
        let Some(position) = list.iter().position(|s| s.same(subscriber)) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            registry.subscribers.remove(&key);
        }
        true
    }
}

/// Generic multi-subscriber event broadcaster.
///
/// Cloning an `Observable` yields another handle to the same notifier.
pub struct Observable<T, A = String> {
    shared: Arc<Shared<T, A>>,
}

impl<T, A> Clone for Observable<T, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, A: ActionTag> fmt::Debug for Observable<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.lock();
        let count: usize = registry.subscribers.values().map(Vec::len).sum();
        f.debug_struct("Observable")
            .field("subscribers", &count)
            .field(
                "persisted",
                &registry.persisted.as_ref().map_or(0, Vec::len),
            )
            .finish()
    }
}

impl<T, A> Default for Observable<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: ActionTag,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> Observable<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: ActionTag,
{
    /// Create a notifier that reports subscriber failures through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create a notifier reporting subscriber failures to `sink`.
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry {
                    subscribers: HashMap::new(),
                    persisted: None,
                }),
                sink,
            }),
        }
    }

    /// The sink this notifier reports to. Containers hand it to the
    /// notifiers they create internally.
    pub fn sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::clone(&self.shared.sink)
    }

    /// Register `subscriber` for `action` (`None` = all actions).
    ///
    /// Persisted events matching the tag are replayed to the subscriber, in
    /// publish order, before this returns. Registering a pair that is already
    /// registered changes nothing and replays nothing.
    pub fn subscribe(&self, subscriber: &Subscriber<T, A>, action: Option<A>) -> Subscription {
        let replay = {
            let mut registry = self.shared.registry.lock();
            let list = registry.subscribers.entry(action.clone()).or_default();
            if list.iter().any(|s| s.same(subscriber)) {
                tracing::debug!(
                    action = action.as_ref().map_or("", |tag| tag.as_str()),
                    "Subscriber already registered for action"
                );
                Vec::new()
            } else {
                list.push(subscriber.clone());
                match &registry.persisted {
                    Some(events) => events
                        .iter()
                        .filter(|(_, tag)| action.as_ref().map_or(true, |wanted| wanted == tag))
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                }
            }
        };

        for (value, tag) in &replay {
            self.invoke(subscriber, value, tag);
        }

        let weak = Arc::downgrade(&self.shared);
        let registered = subscriber.clone();
        Subscription::from_fn(move || {
            if let Some(shared) = weak.upgrade() {
                shared.remove(&registered, action.as_ref());
            }
        })
    }

    /// Remove a registration. Returns whether anything was removed.
    pub fn unsubscribe(&self, subscriber: &Subscriber<T, A>, action: Option<A>) -> bool {
        self.shared.remove(subscriber, action.as_ref())
    }

    /// Dispatch `value` to subscribers of `action`, then to all-actions
    /// subscribers.
    pub fn notify(&self, value: T, action: A) {
        self.dispatch(&value, &action);
    }

    /// Like [`Observable::notify`], and additionally records the event so
    /// that future subscribers receive it when they register.
    pub fn notify_persistent(&self, value: T, action: A) {
        self.dispatch(&value, &action);
        self.shared
            .registry
            .lock()
            .persisted
            .get_or_insert_with(Vec::new)
            .push((value, action));
    }

    /// Total number of registrations across all tags.
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .registry
            .lock()
            .subscribers
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Number of persisted events.
    pub fn persisted_len(&self) -> usize {
        self.shared
            .registry
            .lock()
            .persisted
            .as_ref()
            .map_or(0, Vec::len)
    }

    /// Address of the shared state; equal for clones of the same notifier.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.shared).cast::<()>() as usize
    }

    fn dispatch(&self, value: &T, action: &A) {
        let (targeted, broadcast) = {
            let registry = self.shared.registry.lock();
            (
                registry
                    .subscribers
                    .get(&Some(action.clone()))
                    .cloned()
                    .unwrap_or_default(),
                registry
                    .subscribers
                    .get(&None)
                    .cloned()
                    .unwrap_or_default(),
            )
        };

        tracing::trace!(
            action = action.as_str(),
            subscribers = targeted.len() + broadcast.len(),
            "Dispatching notification"
        );

        for subscriber in targeted.iter().chain(broadcast.iter()) {
            self.invoke(subscriber, value, action);
        }
    }

    fn invoke(&self, subscriber: &Subscriber<T, A>, value: &T, action: &A) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(value, action)));
        let (kind, message) = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => (FailureKind::Error, format!("{err:#}")),
            Err(payload) => (FailureKind::Panic, panic_message(payload.as_ref())),
        };
        self.shared.sink.report(SubscriberFailure {
            action: action.as_str().to_string(),
            kind,
            message,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::diagnostics::RecordingSink;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str) -> Subscriber<i32, String> {
        let log = Arc::clone(log);
        Subscriber::new(move |value: &i32, action: &String| {
            log.lock().push(format!("{name}:{value}:{action}"));
        })
    }

    fn tag(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn notify_runs_in_registration_order() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let _a = observable.subscribe(&recorder(&log, "a"), tag("x"));
        let _b = observable.subscribe(&recorder(&log, "b"), tag("x"));
        let _c = observable.subscribe(&recorder(&log, "c"), tag("x"));

        observable.notify(1, "x".to_string());

        assert_eq!(*log.lock(), vec!["a:1:x", "b:1:x", "c:1:x"]);
    }

    #[test]
    fn targeted_subscribers_run_before_broadcast_ones() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let _all = observable.subscribe(&recorder(&log, "all"), None);
        let _x = observable.subscribe(&recorder(&log, "x"), tag("x"));

        observable.notify(7, "x".to_string());

        assert_eq!(*log.lock(), vec!["x:7:x", "all:7:x"]);
    }

    #[test]
    fn tag_scoping() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let _a = observable.subscribe(&recorder(&log, "a"), tag("a"));
        let _all = observable.subscribe(&recorder(&log, "all"), None);

        observable.notify(1, "b".to_string());
        observable.notify(2, "a".to_string());

        assert_eq!(*log.lock(), vec!["all:1:b", "a:2:a", "all:2:a"]);
    }

    #[test]
    fn failing_subscriber_is_isolated() {
        let log: Log = Arc::default();
        let sink = Arc::new(RecordingSink::new());
        let observable: Observable<i32> = Observable::with_sink(sink.clone());

        let _first = observable.subscribe(&recorder(&log, "first"), None);
        let failing = Subscriber::fallible(|_: &i32, _: &String| anyhow::bail!("boom"));
        let _second = observable.subscribe(&failing, None);
        let panicking = Subscriber::new(|_: &i32, _: &String| panic!("kaboom"));
        let _third = observable.subscribe(&panicking, None);
        let _fourth = observable.subscribe(&recorder(&log, "fourth"), None);

        observable.notify(3, "set".to_string());

        assert_eq!(*log.lock(), vec!["first:3:set", "fourth:3:set"]);
        let failures = sink.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].kind, FailureKind::Error);
        assert_eq!(failures[0].message, "boom");
        assert_eq!(failures[1].kind, FailureKind::Panic);
        assert_eq!(failures[1].message, "kaboom");
        assert_eq!(failures[1].action, "set");
    }

    #[test]
    fn self_unsubscribe_during_dispatch_completes_current_pass() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();

        let subscriber = {
            let log = Arc::clone(&log);
            let slot = Arc::clone(&slot);
            Subscriber::new(move |value: &i32, _: &String| {
                if let Some(subscription) = slot.lock().take() {
                    subscription.unsubscribe();
                }
                log.lock().push(format!("once:{value}"));
            })
        };
        let subscription = observable.subscribe(&subscriber, None);
        *slot.lock() = Some(subscription);
        let _after = observable.subscribe(&recorder(&log, "after"), None);

        observable.notify(1, "x".to_string());
        observable.notify(2, "x".to_string());

        assert_eq!(*log.lock(), vec!["once:1", "after:1:x", "after:2:x"]);
    }

    #[test]
    fn subscriber_added_during_dispatch_waits_for_next_notify() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let late = recorder(&log, "late");

        let adder = {
            let observable = observable.clone();
            let late = late.clone();
            Subscriber::new(move |_: &i32, _: &String| {
                let _ = observable.subscribe(&late, None);
            })
        };
        let _adder = observable.subscribe(&adder, None);

        observable.notify(1, "x".to_string());
        assert!(log.lock().is_empty());

        observable.notify(2, "x".to_string());
        assert_eq!(*log.lock(), vec!["late:2:x"]);
    }

    #[test]
    fn persisted_events_replay_on_subscribe() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        observable.notify_persistent(1, "x".to_string());
        observable.notify_persistent(2, "x".to_string());
        observable.notify_persistent(3, "y".to_string());
        observable.notify(4, "x".to_string());

        let _x = observable.subscribe(&recorder(&log, "x"), tag("x"));
        assert_eq!(*log.lock(), vec!["x:1:x", "x:2:x"]);

        log.lock().clear();
        let _all = observable.subscribe(&recorder(&log, "all"), None);
        assert_eq!(*log.lock(), vec!["all:1:x", "all:2:x", "all:3:y"]);
        assert_eq!(observable.persisted_len(), 3);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let subscriber = recorder(&log, "dup");

        let _first = observable.subscribe(&subscriber, None);
        let _second = observable.subscribe(&subscriber, None);
        let _tagged = observable.subscribe(&subscriber, tag("x"));
        assert_eq!(observable.subscriber_count(), 2);

        observable.notify(1, "x".to_string());
        assert_eq!(*log.lock(), vec!["dup:1:x", "dup:1:x"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let subscriber = recorder(&log, "s");
        let subscription = observable.subscribe(&subscriber, tag("x"));

        assert!(!observable.unsubscribe(&subscriber, None));
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!observable.unsubscribe(&subscriber, tag("x")));
        assert_eq!(observable.subscriber_count(), 0);

        observable.notify(1, "x".to_string());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn subscription_outlives_notifier() {
        let log: Log = Arc::default();
        let observable: Observable<i32> = Observable::new();
        let subscription = observable.subscribe(&recorder(&log, "s"), None);
        drop(observable);
        subscription.unsubscribe();
        assert!(!subscription.is_inert());
        assert!(Subscription::inert().is_inert());
    }
}
