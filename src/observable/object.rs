//! Keyed collection with a live, insertion-ordered key list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::array::{ObservableArray, ReadonlyObservableArray};
use super::diagnostics::{DiagnosticSink, TracingSink};
use super::notifier::{ActionTag, Observable, Subscriber, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectAction {
    Add,
    Replace,
    Delete,
}

impl ActionTag for ObjectAction {
    fn as_str(&self) -> &str {
        match self {
            ObjectAction::Add => "add",
            ObjectAction::Replace => "replace",
            ObjectAction::Delete => "delete",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "add" => Some(ObjectAction::Add),
            "replace" => Some(ObjectAction::Replace),
            "delete" => Some(ObjectAction::Delete),
            _ => None,
        }
    }
}

/// The entry an [`ObjectAction`] applied to. For `Delete` the value is the
/// one that was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEvent<V> {
    pub key: String,
    pub value: V,
}

struct ObjectInner<V> {
    entries: RwLock<HashMap<String, V>>,
    keys: ObservableArray<String>,
    notifier: Observable<ObjectEvent<V>, ObjectAction>,
}

/// Observable string-keyed map.
///
/// The key list is itself an [`ObservableArray`], so views can follow
/// insertions and removals without subscribing to the values. Its contents
/// always equal the map's key set.
pub struct ObservableObject<V> {
    inner: Arc<ObjectInner<V>>,
}

impl<V> Clone for ObservableObject<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for ObservableObject<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableObject")
            .field("entries", &*self.inner.entries.read())
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ObservableObject<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> ObservableObject<V> {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create an object whose subscriber failures, including those of its
    /// key list, go to `sink`.
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                entries: RwLock::new(HashMap::new()),
                keys: ObservableArray::with_sink(Vec::new(), Arc::clone(&sink)),
                notifier: Observable::with_sink(sink),
            }),
        }
    }

    /// Insert `value` under `key` unless the key already exists. Returns
    /// whether it was inserted.
    pub fn add(&self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        {
            let mut entries = self.inner.entries.write();
            if entries.contains_key(&key) {
                return false;
            }
            entries.insert(key.clone(), value.clone());
        }
        self.inner.keys.push([key.clone()]);
        self.inner
            .notifier
            .notify(ObjectEvent { key, value }, ObjectAction::Add);
        true
    }

    /// Insert or overwrite. Existing keys publish `Replace`, new ones `Add`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let replaced = {
            let mut entries = self.inner.entries.write();
            match entries.get_mut(&key) {
                Some(slot) => {
                    *slot = value.clone();
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.inner
                .notifier
                .notify(ObjectEvent { key, value }, ObjectAction::Replace);
        } else {
            self.add(key, value);
        }
    }

    /// Remove `key` and its key-list entry. Returns the removed value.
    pub fn delete(&self, key: &str) -> Option<V> {
        let value = self.inner.entries.write().remove(key)?;
        if let Some(index) = self.inner.keys.position(|k| k == key) {
            if let Err(err) = self.inner.keys.splice(index, 1, std::iter::empty()) {
                tracing::debug!(key, error = %err, "Key list changed during delete");
            }
        }
        self.inner.notifier.notify(
            ObjectEvent {
                key: key.to_string(),
                value: value.clone(),
            },
            ObjectAction::Delete,
        );
        Some(value)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Values in key insertion order.
    pub fn values(&self) -> Vec<V> {
        let entries = self.inner.entries.read();
        self.inner
            .keys
            .with_items(|keys| keys.iter().filter_map(|key| entries.get(key).cloned()).collect())
    }

    /// Live key list in insertion order.
    pub fn keys(&self) -> ReadonlyObservableArray<String> {
        self.inner.keys.readonly()
    }

    pub fn subscribe(
        &self,
        subscriber: &Subscriber<ObjectEvent<V>, ObjectAction>,
        action: Option<ObjectAction>,
    ) -> Subscription {
        self.inner.notifier.subscribe(subscriber, action)
    }

    pub fn unsubscribe(
        &self,
        subscriber: &Subscriber<ObjectEvent<V>, ObjectAction>,
        action: Option<ObjectAction>,
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
