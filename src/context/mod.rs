//! Explicit store contexts.
//!
//! Stores are never global. A [`StoreContext`] created by the application
//! owns the stores it hands out and is passed to consumers explicitly.

mod context;

pub use context::StoreContext;
