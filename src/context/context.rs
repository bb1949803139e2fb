use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::Store;
use crate::sync;

type Entry = Box<dyn Any + Send + Sync>;

/// Application-owned registry of stores, keyed by state type.
///
/// There is no global store: the application creates a context at its entry
/// point and hands it (or the stores taken from it) to whatever needs them.
///
/// # Examples
///
/// ```
/// use pantry::{Store, StoreContext};
///
/// #[derive(Debug)]
/// struct Session {
///     user: Option<String>,
/// }
///
/// let context = StoreContext::new();
/// context.provide(Store::new(Session { user: None }));
///
/// let session = context.require::<Session>().unwrap();
/// session.replace(Session { user: Some("ada".into()) }).unwrap();
///
/// // every lookup yields a handle to the same store
/// assert_eq!(
///     context.store::<Session>().unwrap().get().user.as_deref(),
///     Some("ada")
/// );
/// ```
#[derive(Default)]
pub struct StoreContext {
    stores: RwLock<HashMap<TypeId, Entry>>,
}

impl StoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store`, returning the store it displaced, if any.
    pub fn provide<S>(&self, store: Store<S>) -> Option<Store<S>>
    where
        S: Send + Sync + 'static,
    {
        debug!(state = type_name::<S>(), "providing store");
        sync::write(&self.stores)
            .insert(TypeId::of::<S>(), Box::new(store))
            .and_then(downcast)
    }

    /// Handle to the store for `S`, if one was provided.
    pub fn store<S>(&self) -> Option<Store<S>>
    where
        S: Send + Sync + 'static,
    {
        sync::read(&self.stores)
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.downcast_ref::<Store<S>>())
            .cloned()
    }

    /// Like [`store`](Self::store), but a missing store is an error.
    pub fn require<S>(&self) -> Result<Store<S>>
    where
        S: Send + Sync + 'static,
    {
        self.store::<S>()
            .ok_or(StoreError::NotProvided(type_name::<S>()))
    }

    /// Unregister the store for `S`. Outstanding handles keep working.
    pub fn remove<S>(&self) -> Option<Store<S>>
    where
        S: Send + Sync + 'static,
    {
        sync::write(&self.stores)
            .remove(&TypeId::of::<S>())
            .and_then(downcast)
    }

    pub fn contains<S: 'static>(&self) -> bool {
        sync::read(&self.stores).contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        sync::read(&self.stores).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<S: Send + Sync + 'static>(entry: Entry) -> Option<Store<S>> {
    entry.downcast::<Store<S>>().ok().map(|store| *store)
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("stores", &self.len())
            .finish()
    }
}
