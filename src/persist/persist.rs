use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::options::PersistOptions;
use super::storage::StateStorage;
use crate::error::{PersistenceError, Result, StoreError};
use crate::store::{Middleware, Store};

/// What is written under the storage key.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: Value,
    #[serde(default)]
    version: u32,
}

struct Inner<S> {
    options: PersistOptions<S>,
    storage: Arc<dyn StateStorage>,
    hydrated: AtomicBool,
}

/// Middleware that saves state on every change and restores it on startup.
///
/// Keep a clone of the middleware to control it after the store is built:
///
/// ```
/// use pantry::persist::{MemoryStorage, Persist, PersistOptions};
/// use pantry::Store;
///
/// let storage = MemoryStorage::new();
/// let persist = Persist::new(PersistOptions::new("count"), storage.clone());
/// let store = Store::builder(|_, _| 0u32).with(persist.clone()).build().unwrap();
///
/// store.replace(5).unwrap();
/// assert!(persist.has_hydrated());
///
/// let fresh = Store::builder(|_, _| 0u32)
///     .with(Persist::new(PersistOptions::new("count"), storage))
///     .build()
///     .unwrap();
/// assert_eq!(*fresh.get(), 5);
/// ```
pub struct Persist<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Persist<S>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(options: PersistOptions<S>, storage: impl StateStorage + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                storage: Arc::new(storage),
                hydrated: AtomicBool::new(false),
            }),
        }
    }

    /// The storage key.
    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    pub fn options(&self) -> &PersistOptions<S> {
        &self.inner.options
    }

    /// Whether stored state has been loaded (or found absent).
    pub fn has_hydrated(&self) -> bool {
        self.inner.hydrated.load(Ordering::SeqCst)
    }

    /// Load stored state into `store`, replacing its current state.
    ///
    /// Listeners are notified if anything was loaded.
    pub fn rehydrate(&self, store: &Store<S>) -> Result<()> {
        self.inner.hydrated.store(false, Ordering::SeqCst);
        let current = store.get();
        let loaded = self.load(&current);
        match self.settle(loaded)? {
            Some(state) => store.replace(state),
            None => Ok(()),
        }
    }

    /// Remove the stored entry. The store keeps its current state.
    pub fn clear_storage(&self) -> Result<()> {
        self.inner
            .storage
            .remove_item(self.name())
            .map_err(|err| self.write_error(err.into()))?;
        debug!(key = self.name(), "cleared persisted state");
        Ok(())
    }

    /// Serialize `state` and write it under the storage key.
    pub fn save(&self, state: &S) -> Result<()> {
        let options = &self.inner.options;
        let state = match &options.partialize {
            Some(partialize) => partialize(state),
            None => serde_json::to_value(state).map_err(|err| self.write_error(err.into()))?,
        };
        let raw = serde_json::to_string(&Envelope {
            state,
            version: options.version,
        })
        .map_err(|err| self.write_error(err.into()))?;

        self.inner
            .storage
            .set_item(self.name(), &raw)
            .map_err(|err| self.write_error(err.into()))?;
        debug!(key = self.name(), bytes = raw.len(), "persisted state");
        Ok(())
    }

    fn load(&self, current: &S) -> Result<Option<S>, PersistenceError> {
        let options = &self.inner.options;
        let Some(raw) = self.inner.storage.get_item(&options.name)? else {
            return Ok(None);
        };

        let envelope: Envelope = serde_json::from_str(&raw)?;
        let mut persisted = envelope.state;
        if envelope.version != options.version {
            let migrate = options
                .migrate
                .as_ref()
                .ok_or(PersistenceError::VersionMismatch {
                    found: envelope.version,
                    expected: options.version,
                })?;
            persisted = migrate(persisted, envelope.version).map_err(|source| {
                PersistenceError::Migration {
                    from: envelope.version,
                    source,
                }
            })?;
            debug!(
                key = %options.name,
                from = envelope.version,
                to = options.version,
                "migrated persisted state"
            );
        }

        let state = match &options.merge {
            Some(merge) => merge(persisted, current).map_err(PersistenceError::Merge)?,
            None => overlay(persisted, current)?,
        };
        Ok(Some(state))
    }

    /// Apply the corrupt-data policy to a load outcome and mark hydration done.
    fn settle(&self, loaded: Result<Option<S>, PersistenceError>) -> Result<Option<S>> {
        let outcome = match loaded {
            Ok(Some(state)) => {
                debug!(key = self.name(), "hydrated state from storage");
                Some(state)
            }
            Ok(None) => None,
            Err(source) if self.inner.options.recover_corrupt => {
                warn!(key = self.name(), error = %source, "discarding unreadable persisted state");
                None
            }
            Err(source) => {
                return Err(StoreError::PersistenceRead {
                    key: self.name().to_string(),
                    source,
                })
            }
        };
        self.inner.hydrated.store(true, Ordering::SeqCst);
        Ok(outcome)
    }

    fn write_error(&self, source: PersistenceError) -> StoreError {
        StoreError::PersistenceWrite {
            key: self.name().to_string(),
            source,
        }
    }
}

/// Stored top-level fields win over the current ones; fields missing from
/// storage keep their current value.
fn overlay<S>(persisted: Value, current: &S) -> Result<S, PersistenceError>
where
    S: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(current)?;
    match (&mut base, persisted) {
        (Value::Object(fields), Value::Object(stored)) => fields.extend(stored),
        (base, stored) => *base = stored,
    }
    Ok(serde_json::from_value(base)?)
}

impl<S> Middleware<S> for Persist<S>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "persist"
    }

    fn on_init(&self, state: S) -> Result<S> {
        if self.inner.options.skip_hydration {
            return Ok(state);
        }
        let loaded = self.load(&state);
        match self.settle(loaded)? {
            Some(hydrated) => {
                // Write back so migrated or merged data is stored in its
                // current shape.
                self.save(&hydrated)?;
                Ok(hydrated)
            }
            None => Ok(state),
        }
    }

    fn on_change(&self, _prev: &S, next: &S) -> Result<()> {
        self.save(next)
    }
}

impl<S> Clone for Persist<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Persist<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persist")
            .field("options", &self.inner.options)
            .field("hydrated", &self.inner.hydrated.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
