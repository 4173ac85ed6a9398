//! Binds a render function to a named set of inputs.
//!
//! An input is either a plain value or a [`Binding`] to a [`Source`]. The
//! binder keeps exactly one live subscription per bound input and a table of
//! current values handed to the render function. It re-renders when a bound
//! source fires a change its filter accepts, when the caller supplies new
//! inputs, or when a source changed between a render and the subscription
//! being established.
//!
//! Lifecycle mirrors a component: `mount` renders once and subscribes;
//! `update` re-derives changed inputs, renders, and reconciles subscriptions;
//! `unmount` (or drop) releases every subscription.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::observable::{Source, SourceId, Subscription};

/// Predicate deciding whether a notification `(value, action)` should update
/// the bound value.
pub type Filter<V> = Arc<dyn Fn(&V, &str) -> bool + Send + Sync>;

type RenderFn<V> = Box<dyn Fn(&BoundValues<V>) + Send + Sync>;

/// A source plus the action and filter selecting which of its notifications
/// matter.
pub struct Binding<V> {
    source: Arc<dyn Source<V>>,
    action: Option<String>,
    filter: Option<Filter<V>>,
}

impl<V> Clone for Binding<V> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            action: self.action.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<V> fmt::Debug for Binding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("source", &self.source.id())
            .field("action", &self.action)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl<V: 'static> Binding<V> {
    pub fn new(source: impl Source<V> + 'static) -> Self {
        Self::shared(Arc::new(source))
    }

    /// Bind an already shared source.
    pub fn shared(source: Arc<dyn Source<V>>) -> Self {
        Self {
            source,
            action: None,
            filter: None,
        }
    }

    /// Only react to `action`. An empty name means every action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        let action = action.into();
        self.action = (!action.is_empty()).then_some(action);
        self
    }

    pub fn filter(mut self, filter: impl Fn(&V, &str) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }
}

pub enum Input<V> {
    Plain(V),
    Observed(Binding<V>),
}

impl<V: Clone> Clone for Input<V> {
    fn clone(&self) -> Self {
        match self {
            Input::Plain(value) => Input::Plain(value.clone()),
            Input::Observed(binding) => Input::Observed(binding.clone()),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Input<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Input::Observed(binding) => f.debug_tuple("Observed").field(binding).finish(),
        }
    }
}

impl<V> From<Binding<V>> for Input<V> {
    fn from(binding: Binding<V>) -> Self {
        Input::Observed(binding)
    }
}

impl<V: Clone + 'static> Input<V> {
    /// Observe every action of `source`.
    pub fn observe(source: impl Source<V> + 'static) -> Self {
        Input::Observed(Binding::new(source))
    }

    fn key(&self) -> InputKey<V> {
        match self {
            Input::Plain(value) => InputKey::Plain(value.clone()),
            Input::Observed(binding) => {
                InputKey::Source(binding.source.id(), binding.action.clone())
            }
        }
    }

    /// Value the input contributes right now. `None` for a source that
    /// holds no current value.
    fn current(&self) -> Option<V> {
        match self {
            Input::Plain(value) => Some(value.clone()),
            Input::Observed(binding) => binding.source.snapshot(),
        }
    }
}

/// What decides whether an input changed between updates: the value for
/// plain inputs, the source identity and action for bound ones.
#[derive(Debug, Clone, PartialEq)]
enum InputKey<V> {
    Plain(V),
    Source(SourceId, Option<String>),
}

/// Named inputs supplied to [`Binder::mount`] and [`Binder::update`].
pub struct Inputs<V> {
    entries: BTreeMap<String, Input<V>>,
}

impl<V> Default for Inputs<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V: Clone + 'static> Inputs<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(self, name: impl Into<String>, value: V) -> Self {
        self.with(name, Input::Plain(value))
    }

    pub fn bind(self, name: impl Into<String>, binding: Binding<V>) -> Self {
        self.with(name, Input::Observed(binding))
    }

    pub fn with(mut self, name: impl Into<String>, input: Input<V>) -> Self {
        self.entries.insert(name.into(), input);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V, S: Into<String>> FromIterator<(S, Input<V>)> for Inputs<V> {
    fn from_iter<I: IntoIterator<Item = (S, Input<V>)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, input)| (name.into(), input))
                .collect(),
        }
    }
}

/// Current values by input name, as handed to the render function.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValues<V> {
    values: BTreeMap<String, V>,
}

impl<V> BoundValues<V> {
    pub fn get(&self, name: &str) -> Option<&V> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct Slot {
    generation: u64,
    subscription: Subscription,
}

struct BinderState<V> {
    inputs: BTreeMap<String, Input<V>>,
    /// Input keys as of the last reconcile.
    subscribed: BTreeMap<String, InputKey<V>>,
    subscriptions: BTreeMap<String, Slot>,
    values: BTreeMap<String, V>,
    next_generation: u64,
    renders: usize,
    mounted: bool,
}

struct BinderInner<V> {
    state: Mutex<BinderState<V>>,
    draw: RenderFn<V>,
    after_update: Option<RenderFn<V>>,
}

/// Live binding of a render function to named inputs.
///
/// Dropping the binder unmounts it.
pub struct Binder<V: Clone + PartialEq + Send + Sync + 'static> {
    inner: Arc<BinderInner<V>>,
}

impl<V> fmt::Debug for Binder<V>
where
    V: Clone + PartialEq + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Binder")
            .field("values", &state.values)
            .field("subscriptions", &state.subscriptions.len())
            .field("renders", &state.renders)
            .field("mounted", &state.mounted)
            .finish()
    }
}

impl<V: Clone + PartialEq + Send + Sync + 'static> Binder<V> {
    /// Render once with the inputs' current values, then subscribe.
    pub fn mount<R>(inputs: Inputs<V>, render: R) -> Self
    where
        R: Fn(&BoundValues<V>) + Send + Sync + 'static,
    {
        Self::build(inputs, Box::new(render), None)
    }

    /// Like [`Binder::mount`], with a hook that runs after every
    /// update-driven or notification-driven render.
    pub fn mount_with_hook<R, H>(inputs: Inputs<V>, render: R, after_update: H) -> Self
    where
        R: Fn(&BoundValues<V>) + Send + Sync + 'static,
        H: Fn(&BoundValues<V>) + Send + Sync + 'static,
    {
        Self::build(inputs, Box::new(render), Some(Box::new(after_update)))
    }

    fn build(inputs: Inputs<V>, render: RenderFn<V>, after_update: Option<RenderFn<V>>) -> Self {
        let values = inputs
            .entries
            .iter()
            .filter_map(|(name, input)| input.current().map(|value| (name.clone(), value)))
            .collect();
        let inner = Arc::new(BinderInner {
            state: Mutex::new(BinderState {
                inputs: inputs.entries,
                subscribed: BTreeMap::new(),
                subscriptions: BTreeMap::new(),
                values,
                next_generation: 0,
                renders: 0,
                mounted: true,
            }),
            draw: render,
            after_update,
        });

        inner.render();
        if inner.reconcile() {
            inner.cycle();
        }
        Self { inner }
    }

    /// Replace the inputs. Changed inputs are re-derived, the binder always
    /// renders, then subscriptions are reconciled.
    pub fn update(&self, inputs: Inputs<V>) {
        {
            let mut state = self.inner.state.lock();
            if !state.mounted {
                tracing::debug!("Ignoring update of unmounted binder");
                return;
            }
            let previous = std::mem::replace(&mut state.inputs, inputs.entries);
            let BinderState { inputs, values, .. } = &mut *state;
            for name in previous.keys() {
                if !inputs.contains_key(name) {
                    values.remove(name);
                }
            }
            for (name, input) in inputs.iter() {
                let unchanged = previous
                    .get(name)
                    .is_some_and(|old| old.key() == input.key());
                if unchanged {
                    continue;
                }
                match input.current() {
                    Some(value) => values.insert(name.clone(), value),
                    None => values.remove(name),
                };
            }
        }
        self.inner.cycle();
    }

    /// Release every subscription. Later notifications and updates are
    /// ignored.
    pub fn unmount(&self) {
        self.inner.unmount();
    }

    /// Values most recently handed to the render function or staged for
    /// the next one.
    pub fn values(&self) -> BoundValues<V> {
        BoundValues {
            values: self.inner.state.lock().values.clone(),
        }
    }

    pub fn render_count(&self) -> usize {
        self.inner.state.lock().renders
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.state.lock().subscriptions.len()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.state.lock().mounted
    }
}

impl<V: Clone + PartialEq + Send + Sync + 'static> Drop for Binder<V> {
    fn drop(&mut self) {
        self.inner.unmount();
    }
}

impl<V: Clone + PartialEq + Send + Sync + 'static> BinderInner<V> {
    fn bound_values(&self) -> BoundValues<V> {
        BoundValues {
            values: self.state.lock().values.clone(),
        }
    }

    fn render(&self) {
        let values = {
            let mut state = self.state.lock();
            state.renders += 1;
            BoundValues {
                values: state.values.clone(),
            }
        };
        (self.draw)(&values);
    }

    /// Render, reconcile, run the hook; repeat while reconciling changed a
    /// value.
    fn cycle(self: &Arc<Self>) {
        loop {
            if !self.state.lock().mounted {
                return;
            }
            self.render();
            let changed = self.reconcile();
            if let Some(hook) = &self.after_update {
                hook(&self.bound_values());
            }
            if !changed {
                return;
            }
        }
    }

    /// Bring subscriptions in line with the current inputs. Returns whether
    /// any bound value changed in the process.
    fn reconcile(self: &Arc<Self>) -> bool {
        let mut changed = false;
        let mut stale = Vec::new();
        let mut fresh = Vec::new();
        {
            let mut state = self.state.lock();
            if !state.mounted {
                return false;
            }
            let current: BTreeMap<String, InputKey<V>> = state
                .inputs
                .iter()
                .map(|(name, input)| (name.clone(), input.key()))
                .collect();

            let previous = std::mem::take(&mut state.subscribed);
            for (name, old_key) in &previous {
                if current.get(name) == Some(old_key) {
                    continue;
                }
                if let Some(slot) = state.subscriptions.remove(name) {
                    stale.push(slot.subscription);
                }
                if !current.contains_key(name) && state.values.remove(name).is_some() {
                    changed = true;
                }
            }

            for (name, key) in &current {
                if previous.get(name) == Some(key) {
                    continue;
                }
                if let Some(input) = state.inputs.get(name) {
                    let input = input.clone();
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    fresh.push((name.clone(), input, generation));
                }
            }
            state.subscribed = current;
        }

        for subscription in stale {
            subscription.unsubscribe();
        }

        let mut slots = Vec::new();
        let mut observed = Vec::new();
        for (name, input, generation) in fresh {
            if let Input::Observed(binding) = &input {
                let subscription = binding
                    .source
                    .watch(binding.action.as_deref(), self.handler(&name, generation));
                slots.push((name.clone(), Slot { generation, subscription }));
            }
            observed.push((name, input.current()));
        }

        let mut orphaned = Vec::new();
        {
            let mut state = self.state.lock();
            for (name, slot) in slots {
                if state.mounted {
                    if let Some(old) = state.subscriptions.insert(name, slot) {
                        orphaned.push(old.subscription);
                    }
                } else {
                    orphaned.push(slot.subscription);
                }
            }
            for (name, value) in observed {
                if state.values.get(&name) == value.as_ref() {
                    continue;
                }
                match value {
                    Some(value) => state.values.insert(name, value),
                    None => state.values.remove(&name),
                };
                changed = true;
            }
        }
        for subscription in orphaned {
            subscription.unsubscribe();
        }

        if changed {
            tracing::trace!("Bound value changed while subscribing");
        }
        changed
    }

    fn handler(self: &Arc<Self>, name: &str, generation: u64) -> Arc<dyn Fn(&V, &str) + Send + Sync> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let name = name.to_string();
        Arc::new(move |value: &V, action: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.on_notify(&name, generation, value, action);
            }
        })
    }

    fn on_notify(self: &Arc<Self>, name: &str, generation: u64, value: &V, action: &str) {
        let binding = {
            let state = self.state.lock();
            let live = state
                .subscriptions
                .get(name)
                .is_some_and(|slot| slot.generation == generation);
            match state.inputs.get(name) {
                Some(Input::Observed(binding)) if live => binding.clone(),
                _ => return,
            }
        };

        if let Some(filter) = &binding.filter {
            if !filter(value, action) {
                tracing::trace!(input = name, action, "Notification filtered out");
                return;
            }
        }

        let current = binding.source.snapshot().unwrap_or_else(|| value.clone());
        self.state.lock().values.insert(name.to_string(), current);
        self.cycle();
    }

    fn unmount(&self) {
        let slots = {
            let mut state = self.state.lock();
            if !state.mounted {
                return;
            }
            state.mounted = false;
            state.subscribed.clear();
            std::mem::take(&mut state.subscriptions)
        };
        tracing::debug!(subscriptions = slots.len(), "Unmounting binder");
        for slot in slots.into_values() {
            slot.subscription.unsubscribe();
        }
    }
}
