//! # Subscription registry
//!
//! Key-scoped watchers: an `Arc<Mutex<HashMap<key, ...>>>` registry with
//! a notify-style call that fires plain callbacks, since this engine has
//! no UI component tree to mark dirty — a watcher here observes "the
//! current effective value", not "rerender me".

use crate::types::Value;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

type Callback = Box<dyn Fn(Option<Value>) + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

/// Registry of `(key, callback)` subscriptions. Multiple callbacks per key
/// are allowed and fire in registration order.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    next_id: Arc<AtomicU64>,
    entries: Arc<Mutex<HashMap<String, Vec<Entry>>>>,
}

/// A handle returned by [`SubscriptionRegistry::watch`]. Dropping it does
/// nothing — call [`Unsubscribe::call`] (or just invoke it, it's `Fn`)
/// to remove the watcher; removing an already-removed callback is a no-op.
pub struct Unsubscribe {
    key: String,
    id: u64,
    entries: Arc<Mutex<HashMap<String, Vec<Entry>>>>,
}

impl Unsubscribe {
    pub fn call(self) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(list) = entries.get_mut(&self.key) {
                list.retain(|entry| entry.id != self.id);
            }
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `key`. `watch` does not deliver an
    /// immediate value — callers read `get(key)` themselves.
    pub fn watch(
        &self,
        key: impl Into<String>,
        callback: impl Fn(Option<Value>) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let key = key.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut entries) = self.entries.lock() {
            entries.entry(key.clone()).or_default().push(Entry {
                id,
                callback: Box::new(callback),
            });
        }
        Unsubscribe {
            key,
            id,
            entries: self.entries.clone(),
        }
    }

    /// Invokes every callback registered for `key`, in registration order,
    /// with the current effective value.
    pub fn notify(&self, key: &str, value: Option<Value>) {
        if let Ok(entries) = self.entries.lock() {
            if let Some(list) = entries.get(key) {
                for entry in list {
                    (entry.callback)(value.clone());
                }
            }
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.get(key).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn watchers_fire_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let order = Arc::new(StdMutex::new(Vec::new()));
        let o1 = order.clone();
        registry.watch("value", move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        registry.watch("value", move |_| o2.lock().unwrap().push(2));

        registry.notify("value", Some(json!(5)));

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_entry() {
        let registry = SubscriptionRegistry::new();
        let unsub = registry.watch("value", |_| {});
        assert_eq!(registry.subscriber_count("value"), 1);
        unsub.call();
        assert_eq!(registry.subscriber_count("value"), 0);
    }

    #[test]
    fn unsubscribing_twice_is_a_no_op() {
        let registry = SubscriptionRegistry::new();
        let unsub = registry.watch("value", |_| {});
        let entries = registry.entries.clone();
        let key = "value".to_string();
        let id = 0u64;
        unsub.call();
        // Simulate a caller invoking the same removal logic again.
        Unsubscribe { key, id, entries }.call();
        assert_eq!(registry.subscriber_count("value"), 0);
    }

    #[test]
    fn notify_passes_none_for_absent_values() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(StdMutex::new(None));
        let seen2 = seen.clone();
        registry.watch("value", move |v| *seen2.lock().unwrap() = Some(v));
        registry.notify("value", None);
        assert_eq!(*seen.lock().unwrap(), Some(None));
    }
}
