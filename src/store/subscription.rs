use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use super::store::Store;
use crate::sync;

pub(crate) type Listener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

/// Type-erased view of a store's listener list.
pub(crate) trait Registry: Send + Sync {
    fn remove(&self, id: u64);
}

/// Handle to a registered listener.
///
/// Dropping a `Subscription` keeps the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) or convert it with
/// [`guard`](Subscription::guard) to tie the listener to a scope.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<dyn Registry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, active: Arc<AtomicBool>, registry: Weak<dyn Registry>) -> Self {
        Self {
            id,
            active,
            registry,
        }
    }

    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        trace!(id = self.id, "listener unsubscribed");
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.registry.strong_count() > 0
    }

    /// Turn this handle into a guard that unsubscribes on drop.
    pub fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// RAII guard for store listeners.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

type Equality<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Builder for a listener scoped to a slice of the state.
///
/// Created by [`Store::select`] and [`Store::select_with`].
pub struct Select<'a, S, T, Sel> {
    store: &'a Store<S>,
    selector: Sel,
    equality: Equality<T>,
    fire_immediately: bool,
}

impl<'a, S, T, Sel> Select<'a, S, T, Sel>
where
    S: Send + Sync + 'static,
    T: Clone + Send + 'static,
    Sel: Fn(&S) -> T + Send + Sync + 'static,
{
    pub(crate) fn new<E>(store: &'a Store<S>, selector: Sel, equality: E) -> Self
    where
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            store,
            selector,
            equality: Box::new(equality),
            fire_immediately: false,
        }
    }

    /// Replace the equality used to decide whether the slice changed.
    pub fn with_equality<E>(mut self, equality: E) -> Self
    where
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.equality = Box::new(equality);
        self
    }

    /// Also call the listener once on subscription, with the current slice
    /// as both arguments.
    pub fn fire_immediately(mut self) -> Self {
        self.fire_immediately = true;
        self
    }

    /// Register the listener. It receives `(previous slice, next slice)`.
    pub fn subscribe<F>(self, listener: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let Select {
            store,
            selector,
            equality,
            fire_immediately,
        } = self;

        let initial = store.read(|state| selector(state));
        let current = Arc::new(Mutex::new(initial));
        let listener = Arc::new(listener);

        let subscription = store.subscribe({
            let current = Arc::clone(&current);
            let listener = Arc::clone(&listener);
            move |_prev, next| {
                let next_slice = selector(next);
                let prev_slice = {
                    let mut slot = sync::lock(&current);
                    if equality(&*slot, &next_slice) {
                        return;
                    }
                    std::mem::replace(&mut *slot, next_slice.clone())
                };
                listener(&prev_slice, &next_slice);
            }
        });

        if fire_immediately {
            let slice = sync::lock(&current).clone();
            listener(&slice, &slice);
        }

        subscription
    }
}
