//! Persistence middleware.
//!
//! [`Persist`] saves the state to a [`StateStorage`] backend after every
//! change and restores it when the store is built. The stored value is a JSON
//! envelope:
//!
//! ```json
//! { "state": { "count": 5 }, "version": 0 }
//! ```
//!
//! On hydration the stored top-level fields are laid over the initializer's
//! state, so fields left out by [`PersistOptions::partialize`] keep their
//! initial values.

mod options;
mod persist;
mod storage;

pub use options::PersistOptions;
pub use persist::Persist;
pub use storage::{FileStorage, MemoryStorage, StateStorage};
