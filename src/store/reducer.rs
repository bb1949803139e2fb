use std::sync::Arc;

use super::store::Store;
use crate::error::Result;

type Reduce<S, A> = Arc<dyn Fn(&S, A) -> S + Send + Sync>;

/// A store driven by actions instead of patches.
///
/// ```
/// use pantry::{Reducer, Store};
///
/// enum Action {
///     Increment,
///     Add(i64),
/// }
///
/// let counter = Reducer::new(Store::new(0i64), |count: &i64, action: Action| match action {
///     Action::Increment => count + 1,
///     Action::Add(n) => count + n,
/// });
///
/// counter.dispatch(Action::Increment).unwrap();
/// counter.dispatch(Action::Add(41)).unwrap();
/// assert_eq!(*counter.store().get(), 42);
/// ```
pub struct Reducer<S, A> {
    store: Store<S>,
    reduce: Reduce<S, A>,
}

impl<S, A> Reducer<S, A>
where
    S: Send + Sync + 'static,
{
    pub fn new<F>(store: Store<S>, reduce: F) -> Self
    where
        F: Fn(&S, A) -> S + Send + Sync + 'static,
    {
        Self {
            store,
            reduce: Arc::new(reduce),
        }
    }

    /// Apply `action` to the current state and publish the result.
    pub fn dispatch(&self, action: A) -> Result<()> {
        let reduce = &self.reduce;
        self.store.replace_with(|state| reduce(state, action))
    }

    /// The underlying store, for reads and subscriptions.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

impl<S, A> Clone for Reducer<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            reduce: Arc::clone(&self.reduce),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct Todos {
        items: Vec<String>,
    }

    enum Action {
        Add(String),
        Clear,
    }

    fn reducer() -> Reducer<Todos, Action> {
        Reducer::new(Store::new(Todos { items: vec![] }), |state: &Todos, action: Action| {
            let mut next = state.clone();
            match action {
                Action::Add(item) => next.items.push(item),
                Action::Clear => next.items.clear(),
            }
            next
        })
    }

    #[test]
    fn dispatch_runs_reducer() {
        let todos = reducer();

        todos.dispatch(Action::Add("write tests".to_string())).unwrap();
        todos.dispatch(Action::Add("ship".to_string())).unwrap();
        assert_eq!(todos.store().get().items.len(), 2);

        todos.dispatch(Action::Clear).unwrap();
        assert!(todos.store().get().items.is_empty());
    }

    #[test]
    fn dispatch_notifies_subscribers() {
        let todos = reducer();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let _sub = todos.store().subscribe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        todos.clone().dispatch(Action::Clear).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
