//! Snapshot subscriptions.
//!
//! A subscriber is a callback invoked with every new snapshot, synchronously,
//! right after the snapshot is published. Callbacks are called in
//! registration order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Registry of snapshot callbacks shared by every clone of a Store.
pub(crate) struct Subscribers<S> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback<S>)>>,
}

impl<S: 'static> Subscribers<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Add a callback and return the handle that removes it again.
    pub(crate) fn register<F>(registry: &Arc<Self>, callback: F) -> Subscription
    where
        S: Send + Sync,
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = registry.next_id.fetch_add(1, Ordering::Relaxed);
        registry
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));

        // Weak so a forgotten subscription does not keep the store alive
        let weak: Weak<Self> = Arc::downgrade(registry);
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.remove(id);
                }
            })),
        }
    }

    fn remove(&self, id: u64) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
        tracing::debug!(subscription = id, "Subscriber removed");
    }

    /// Number of registered callbacks.
    pub(crate) fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Invoke every callback with `snapshot`, returning how many ran.
    ///
    /// The list is copied first so a callback may unsubscribe (itself or
    /// others) without deadlocking. A callback removed during this pass
    /// still sees the current snapshot.
    pub(crate) fn notify(&self, snapshot: &S) -> usize {
        let callbacks: Vec<Callback<S>> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &callbacks {
            callback(snapshot);
        }

        callbacks.len()
    }
}

/// Handle to a registered snapshot callback.
///
/// Dropping the handle unsubscribes. Call [`Subscription::detach`] to keep the
/// callback registered for the lifetime of the store instead.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Registration id, unique per store.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving snapshots.
    ///
    /// Has no effect on a callback invocation that is already running.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered after this handle is gone.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_notify_in_registration_order() {
        let registry = Arc::new(Subscribers::<u32>::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        let _a = Subscribers::register(&registry, move |v: &u32| first.lock().unwrap().push(("a", *v)));
        let second = Arc::clone(&order);
        let _b = Subscribers::register(&registry, move |v: &u32| second.lock().unwrap().push(("b", *v)));

        assert_eq!(registry.notify(&7), 2);
        assert_eq!(*order.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_detach_keeps_callback() {
        let registry = Arc::new(Subscribers::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        Subscribers::register(&registry, move |_: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .detach();

        registry.notify(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = Arc::new(Subscribers::<u32>::new());
        let subscription = Subscribers::register(&registry, |_: &u32| {});
        drop(registry);

        // Must not panic when the store is already gone
        subscription.unsubscribe();
    }
}
