use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};

use tracing::trace;

use super::middleware::{Middleware, StoreBuilder};
use super::subscription::{Listener, Registry, Select, Subscription};
use crate::error::{Result, StoreError};
use crate::state::Merge;
use crate::sync;

struct ListenerEntry<S> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Listener<S>,
}

/// State cell, listener list and middleware shared by every handle of a store.
pub(crate) struct Shared<S> {
    state: RwLock<Arc<S>>,
    listeners: RwLock<Vec<ListenerEntry<S>>>,
    next_listener: AtomicU64,
    middleware: Vec<Arc<dyn Middleware<S>>>,
    /// Serializes middleware `on_change` passes.
    publish: Mutex<()>,
}

impl<S: Send + Sync + 'static> Shared<S> {
    /// Swap in the state produced by `f` and publish the change.
    ///
    /// `f` runs under the state write lock; listeners and middleware run after
    /// it is released. A change replaced by a newer one before it is published
    /// (a listener mutated the store, or another thread did) is not published
    /// any further: the newer change carries it.
    fn commit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&S) -> S,
    {
        let (prev, next) = {
            let mut slot = sync::write(&self.state);
            let next = Arc::new(f(&**slot));
            let prev = std::mem::replace(&mut *slot, Arc::clone(&next));
            (prev, next)
        };

        self.notify(&prev, &next);

        if self.middleware.is_empty() {
            return Ok(());
        }
        let _published = sync::lock(&self.publish);
        if !self.is_current(&next) {
            trace!("change superseded before middleware ran");
            return Ok(());
        }
        let mut outcome = Ok(());
        for middleware in &self.middleware {
            if let Err(err) = middleware.on_change(&prev, &next) {
                trace!(middleware = middleware.name(), error = %err, "middleware rejected change");
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        }
        outcome
    }

    /// Call every active listener in registration order, with no lock held.
    ///
    /// The pass stops as soon as `next` is no longer the installed state; the
    /// pass for the newer state has already delivered it.
    fn notify(&self, prev: &Arc<S>, next: &Arc<S>) {
        let snapshot: Vec<(Arc<AtomicBool>, Listener<S>)> = sync::read(&self.listeners)
            .iter()
            .map(|entry| (Arc::clone(&entry.active), Arc::clone(&entry.callback)))
            .collect();

        trace!(listeners = snapshot.len(), "state replaced");

        for (active, callback) in snapshot {
            if !self.is_current(next) {
                trace!("notification pass superseded");
                return;
            }
            // A listener earlier in this pass may have unsubscribed this one.
            if active.load(Ordering::SeqCst) {
                callback(prev, next);
            }
        }
    }

    fn is_current(&self, state: &Arc<S>) -> bool {
        Arc::ptr_eq(&sync::read(&self.state), state)
    }

    fn get(&self) -> Arc<S> {
        Arc::clone(&sync::read(&self.state))
    }
}

impl<S: Send + Sync + 'static> Registry for Shared<S> {
    fn remove(&self, id: u64) {
        sync::write(&self.listeners).retain(|entry| entry.id != id);
    }
}

/// Link from the initializer handles to the store they belong to.
///
/// Empty until the initializer has returned and middleware has run.
type Link<S> = Arc<OnceLock<Weak<Shared<S>>>>;

fn resolve<S>(link: &Link<S>) -> Result<Arc<Shared<S>>> {
    link.get()
        .ok_or(StoreError::MutationDuringInit)?
        .upgrade()
        .ok_or(StoreError::Detached)
}

/// Mutation handle passed to a store initializer.
///
/// The handle can be cloned and kept, e.g. inside action closures. Mutating
/// before the initializer has returned fails with
/// [`StoreError::MutationDuringInit`]; mutating after the store has been
/// dropped fails with [`StoreError::Detached`].
pub struct Setter<S> {
    link: Link<S>,
}

impl<S: Send + Sync + 'static> Setter<S> {
    /// Shallow-merge `patch` into the current state.
    pub fn set(&self, patch: S::Patch) -> Result<()>
    where
        S: Merge,
    {
        resolve(&self.link)?.commit(|state| state.merge(patch))
    }

    /// Compute a patch from the current state and merge it.
    pub fn set_with<F>(&self, f: F) -> Result<()>
    where
        S: Merge,
        F: FnOnce(&S) -> S::Patch,
    {
        resolve(&self.link)?.commit(|state| state.merge(f(state)))
    }

    /// Replace the whole state.
    pub fn replace(&self, state: S) -> Result<()> {
        resolve(&self.link)?.commit(move |_| state)
    }
}

impl<S> Clone for Setter<S> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
        }
    }
}

/// Read handle passed to a store initializer.
pub struct Getter<S> {
    link: Link<S>,
}

impl<S: Send + Sync + 'static> Getter<S> {
    /// Current state, or an error while the store is still being built.
    pub fn get(&self) -> Result<Arc<S>> {
        Ok(resolve(&self.link)?.get())
    }
}

impl<S> Clone for Getter<S> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
        }
    }
}

/// A thread-safe store for managing application state.
///
/// The state lives behind an `Arc` that is swapped on every mutation, so two
/// reads with no mutation in between return the same allocation:
///
/// ```
/// use pantry::Store;
/// use std::sync::Arc;
///
/// let store = Store::new(vec![1, 2, 3]);
/// assert!(Arc::ptr_eq(&store.get(), &store.get()));
///
/// store.replace(vec![4]).unwrap();
/// assert_eq!(*store.get(), vec![4]);
/// ```
pub struct Store<S> {
    shared: Arc<Shared<S>>,
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Create a store from an initializer.
    ///
    /// The initializer runs exactly once and receives handles bound to the
    /// store being created. The handles only work once it has returned.
    ///
    /// ```
    /// use pantry::{state, Store};
    ///
    /// state! {
    ///     #[derive(Clone)]
    ///     pub struct Counter => CounterPatch {
    ///         pub count: i64,
    ///     }
    /// }
    ///
    /// let mut increment = None;
    /// let store = Store::<Counter>::create(|set, _get| {
    ///     let set = set.clone();
    ///     increment = Some(move || set.set_with(|s| CounterPatch::default().count(s.count + 1)));
    ///     Counter { count: 0 }
    /// });
    ///
    /// let increment = increment.unwrap();
    /// increment().unwrap();
    /// increment().unwrap();
    /// assert_eq!(store.get().count, 2);
    /// ```
    pub fn create<F>(initializer: F) -> Self
    where
        F: FnOnce(&Setter<S>, &Getter<S>) -> S,
    {
        let link: Link<S> = Arc::new(OnceLock::new());
        let initial = Self::initialize(&link, initializer);
        Self::assemble(link, initial, Vec::new())
    }

    /// Create a store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self::create(move |_, _| initial)
    }

    /// Start building a store whose initializer is wrapped by middleware.
    pub fn builder<F>(initializer: F) -> StoreBuilder<S, F>
    where
        F: FnOnce(&Setter<S>, &Getter<S>) -> S,
    {
        StoreBuilder::new(initializer)
    }

    pub(crate) fn build_with<F>(
        initializer: F,
        middleware: Vec<Arc<dyn Middleware<S>>>,
    ) -> Result<Self>
    where
        F: FnOnce(&Setter<S>, &Getter<S>) -> S,
    {
        let link: Link<S> = Arc::new(OnceLock::new());
        let mut state = Self::initialize(&link, initializer);
        for layer in &middleware {
            state = layer.on_init(state)?;
        }
        Ok(Self::assemble(link, state, middleware))
    }

    fn initialize<F>(link: &Link<S>, initializer: F) -> S
    where
        F: FnOnce(&Setter<S>, &Getter<S>) -> S,
    {
        let set = Setter {
            link: Arc::clone(link),
        };
        let get = Getter {
            link: Arc::clone(link),
        };
        initializer(&set, &get)
    }

    fn assemble(link: Link<S>, state: S, middleware: Vec<Arc<dyn Middleware<S>>>) -> Self {
        let shared = Arc::new(Shared {
            state: RwLock::new(Arc::new(state)),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            middleware,
            publish: Mutex::new(()),
        });
        // The link is fresh, so this is the only value it will ever hold.
        let _ = link.set(Arc::downgrade(&shared));
        Self { shared }
    }

    /// Get the current state.
    pub fn get(&self) -> Arc<S> {
        self.shared.get()
    }

    /// Read state without cloning the `Arc`.
    ///
    /// `f` runs under the store's read lock and must not mutate this store.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = sync::read(&self.shared.state);
        f(&**state)
    }

    /// Replace the whole state.
    pub fn replace(&self, state: S) -> Result<()> {
        self.shared.commit(move |_| state)
    }

    /// Replace the whole state with a value computed from the current one.
    ///
    /// `f` runs under the store's write lock and must not call back into this
    /// store.
    pub fn replace_with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&S) -> S,
    {
        self.shared.commit(f)
    }

    /// Edit a copy of the current state in place, then install the copy.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        S: Clone,
        F: FnOnce(&mut S),
    {
        self.shared.commit(|state| {
            let mut next = state.clone();
            f(&mut next);
            next
        })
    }

    /// Subscribe to state changes.
    ///
    /// The listener is called with `(previous, next)` after every mutation,
    /// in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S, &S) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));
        sync::write(&self.shared.listeners).push(ListenerEntry {
            id,
            active: Arc::clone(&active),
            callback: Arc::new(listener),
        });
        trace!(id, "listener subscribed");

        let shared: Weak<Shared<S>> = Arc::downgrade(&self.shared);
        let registry: Weak<dyn Registry> = shared;
        Subscription::new(id, active, registry)
    }

    /// Subscribe to a slice of the state.
    ///
    /// The listener receives `(previous slice, next slice)` and only fires when
    /// the selected value changes under `PartialEq`.
    pub fn subscribe_selected<T, Sel, F>(&self, selector: Sel, listener: F) -> Subscription
    where
        T: Clone + PartialEq + Send + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.select(selector).subscribe(listener)
    }

    /// Build a selector subscription compared with `PartialEq`.
    pub fn select<T, Sel>(&self, selector: Sel) -> Select<'_, S, T, Sel>
    where
        T: Clone + PartialEq + Send + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
    {
        Select::new(self, selector, crate::equality::by_value::<T>)
    }

    /// Build a selector subscription compared with a custom equality function.
    pub fn select_with<T, Sel, E>(&self, selector: Sel, equality: E) -> Select<'_, S, T, Sel>
    where
        T: Clone + Send + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Select::new(self, selector, equality)
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        sync::read(&self.shared.listeners).len()
    }
}

impl<S: Merge + Send + Sync + 'static> Store<S> {
    /// Shallow-merge `patch` into the current state.
    pub fn set(&self, patch: S::Patch) -> Result<()> {
        self.shared.commit(|state| state.merge(patch))
    }

    /// Compute a patch from the current state and merge it.
    ///
    /// `f` runs under the store's write lock and must not call back into this
    /// store.
    pub fn set_with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&S) -> S::Patch,
    {
        self.shared.commit(|state| state.merge(f(state)))
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("middleware", &self.shared.middleware.len())
            .finish_non_exhaustive()
    }
}
