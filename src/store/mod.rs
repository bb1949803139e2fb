//! High-level state management with stores.
//!
//! A [`Store`] owns one state value, swaps it on every mutation and notifies
//! its listeners. Middleware layers wrap the initializer and observe changes;
//! a [`Reducer`] drives a store with actions.

mod middleware;
mod reducer;
mod store;
mod subscription;

pub use middleware::{Middleware, StoreBuilder, Trace};
pub use reducer::Reducer;
pub use store::{Getter, Setter, Store};
pub use subscription::{Select, Subscription, SubscriptionGuard};
