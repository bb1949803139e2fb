//! Error types for stores and persistence.

use thiserror::Error;

/// Boxed error returned by user-supplied migration and merge functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store state accessed before its initializer returned")]
    MutationDuringInit,

    #[error("store handle outlived its store")]
    Detached,

    #[error("no store provided for state type {0}")]
    NotProvided(&'static str),

    #[error("failed to read persisted state under key '{key}'")]
    PersistenceRead {
        key: String,
        #[source]
        source: PersistenceError,
    },

    #[error("failed to persist state under key '{key}'")]
    PersistenceWrite {
        key: String,
        #[source]
        source: PersistenceError,
    },
}

/// Underlying cause of a persistence failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed persisted state: {0}")]
    Format(#[from] serde_json::Error),

    #[error("persisted state has version {found}, expected {expected} and no migration is configured")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("migration from version {from} failed: {source}")]
    Migration {
        from: u32,
        #[source]
        source: BoxError,
    },

    #[error("merging persisted state failed: {0}")]
    Merge(#[source] BoxError),
}

impl StoreError {
    /// Whether the error came from the persistence layer.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            StoreError::PersistenceRead { .. } | StoreError::PersistenceWrite { .. }
        )
    }
}
