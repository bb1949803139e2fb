use serde_json::Value;

use crate::error::BoxError;

pub(crate) type Migrate = Box<dyn Fn(Value, u32) -> Result<Value, BoxError> + Send + Sync>;
pub(crate) type Partialize<S> = Box<dyn Fn(&S) -> Value + Send + Sync>;
pub(crate) type MergePersisted<S> = Box<dyn Fn(Value, &S) -> Result<S, BoxError> + Send + Sync>;

/// Configuration for the [`Persist`](super::Persist) middleware.
///
/// Only `name`, the storage key, is required:
///
/// ```
/// use pantry::persist::PersistOptions;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Settings {
///     theme: String,
///     session_token: Option<String>,
/// }
///
/// let options = PersistOptions::<Settings>::new("settings")
///     .version(2)
///     .partialize(|s| serde_json::json!({ "theme": s.theme }));
/// assert_eq!(options.name(), "settings");
/// ```
pub struct PersistOptions<S> {
    pub(crate) name: String,
    pub(crate) version: u32,
    pub(crate) migrate: Option<Migrate>,
    pub(crate) partialize: Option<Partialize<S>>,
    pub(crate) merge: Option<MergePersisted<S>>,
    pub(crate) skip_hydration: bool,
    pub(crate) recover_corrupt: bool,
}

impl<S> PersistOptions<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
            migrate: None,
            partialize: None,
            merge: None,
            skip_hydration: false,
            recover_corrupt: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version written next to the state. Stored data with another version
    /// goes through `migrate`, or fails to load if none is set.
    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Upgrade stored state written under an older version.
    #[must_use]
    pub fn migrate<F>(mut self, migrate: F) -> Self
    where
        F: Fn(Value, u32) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.migrate = Some(Box::new(migrate));
        self
    }

    /// Choose what gets written. Defaults to the whole state.
    #[must_use]
    pub fn partialize<F>(mut self, partialize: F) -> Self
    where
        F: Fn(&S) -> Value + Send + Sync + 'static,
    {
        self.partialize = Some(Box::new(partialize));
        self
    }

    /// Combine stored state with the current one during hydration.
    ///
    /// Defaults to overlaying the stored top-level fields onto the current
    /// state.
    #[must_use]
    pub fn merge<F>(mut self, merge: F) -> Self
    where
        F: Fn(Value, &S) -> Result<S, BoxError> + Send + Sync + 'static,
    {
        self.merge = Some(Box::new(merge));
        self
    }

    /// Do not hydrate while the store is built.
    #[must_use]
    pub fn skip_hydration(mut self) -> Self {
        self.skip_hydration = true;
        self
    }

    /// Keep the current state when stored data cannot be loaded, instead of
    /// failing.
    #[must_use]
    pub fn recover_corrupt(mut self) -> Self {
        self.recover_corrupt = true;
        self
    }
}

impl<S> std::fmt::Debug for PersistOptions<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistOptions")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("migrate", &self.migrate.is_some())
            .field("partialize", &self.partialize.is_some())
            .field("merge", &self.merge.is_some())
            .field("skip_hydration", &self.skip_hydration)
            .field("recover_corrupt", &self.recover_corrupt)
            .finish()
    }
}
