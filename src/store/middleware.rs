use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::store::{Getter, Setter, Store};
use crate::error::Result;

/// A layer composed around a store's initializer.
///
/// `on_init` sees the initializer's result before the store publishes it, in
/// the order layers were added. `on_change` runs after listeners for every
/// mutation; an error from it is returned to the mutating caller, but the new
/// state stays in place. A change that a newer one replaced before its
/// middleware pass (a listener mutated the store, or another thread did) is
/// skipped, so the last call always sees the installed state.
///
/// `on_change` calls are serialized and must not mutate the store.
pub trait Middleware<S>: Send + Sync + 'static {
    /// Short name used in log output.
    fn name(&self) -> &str;

    fn on_init(&self, state: S) -> Result<S> {
        Ok(state)
    }

    fn on_change(&self, prev: &S, next: &S) -> Result<()> {
        let _ = (prev, next);
        Ok(())
    }
}

/// Builder returned by [`Store::builder`].
pub struct StoreBuilder<S, F> {
    initializer: F,
    layers: Vec<Arc<dyn Middleware<S>>>,
}

impl<S, F> StoreBuilder<S, F>
where
    S: Send + Sync + 'static,
    F: FnOnce(&Setter<S>, &Getter<S>) -> S,
{
    pub(crate) fn new(initializer: F) -> Self {
        Self {
            initializer,
            layers: Vec::new(),
        }
    }

    /// Add a middleware layer.
    #[must_use]
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<S>,
    {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Run the initializer through every layer and create the store.
    pub fn build(self) -> Result<Store<S>> {
        debug!(layers = self.layers.len(), "building store");
        Store::build_with(self.initializer, self.layers)
    }
}

/// Logs every state change at `debug` level.
pub struct Trace<S> {
    name: String,
    _state: PhantomData<fn(&S)>,
}

impl<S> Trace<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _state: PhantomData,
        }
    }
}

impl<S: Debug + Send + Sync + 'static> Middleware<S> for Trace<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_init(&self, state: S) -> Result<S> {
        debug!(store = %self.name, state = ?state, "store created");
        Ok(state)
    }

    fn on_change(&self, prev: &S, next: &S) -> Result<()> {
        debug!(store = %self.name, ?prev, ?next, "state changed");
        Ok(())
    }
}
