//! # Pantry
//!
//! Observable state stores for Rust.
//!
//! A [`Store`] holds one application state value behind an `Arc` and replaces
//! it on every mutation:
//! - `set` shallow-merges a typed patch (see [`state!`]) into the state
//! - `get` returns the current state; reads between mutations share one `Arc`
//! - `subscribe` registers listeners, optionally scoped to a selector
//!
//! ## Middleware
//!
//! Layers wrap the store initializer and observe every change:
//! - [`persist::Persist`] - saves state to a key-value backend and restores it
//! - [`Trace`] - logs changes through `tracing`
//!
//! ## Example
//!
//! ```
//! use pantry::persist::{MemoryStorage, Persist, PersistOptions};
//! use pantry::{state, Store};
//! use serde::{Deserialize, Serialize};
//!
//! state! {
//!     #[derive(Clone, Debug, Serialize, Deserialize)]
//!     pub struct Counter => CounterPatch {
//!         pub count: i64,
//!         pub unrelated: i64,
//!     }
//! }
//!
//! let storage = MemoryStorage::new();
//! let build = || {
//!     Store::builder(|_, _| Counter { count: 0, unrelated: 0 })
//!         .with(Persist::new(PersistOptions::new("counter-storage"), storage.clone()))
//!         .build()
//! };
//!
//! let store = build()?;
//! for _ in 0..3 {
//!     store.set_with(|s| CounterPatch::default().count(s.count + 1))?;
//! }
//! assert_eq!(store.get().count, 3);
//!
//! let reloaded = build()?;
//! assert_eq!(reloaded.get().count, 3);
//! # Ok::<(), pantry::StoreError>(())
//! ```

pub mod context;
pub mod equality;
pub mod error;
pub mod persist;
pub mod state;
pub mod store;

mod sync;

// Re-export main types for convenience
pub use context::StoreContext;
pub use error::{BoxError, PersistenceError, Result, StoreError};
pub use state::Merge;
pub use store::{
    Getter, Middleware, Reducer, Select, Setter, Store, StoreBuilder, Subscription,
    SubscriptionGuard, Trace,
};
