//! Integration tests for Pantry

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use pantry::persist::{FileStorage, MemoryStorage, Persist, PersistOptions, StateStorage};
use pantry::{equality, state, Merge, PersistenceError, Reducer, Store, StoreContext, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

state! {
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Counter => CounterPatch {
        pub count: i64,
        pub unrelated: i64,
    }
}

fn counter() -> Counter {
    Counter {
        count: 0,
        unrelated: 0,
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn set_is_shallow_merge_of_previous_state() {
    let store = Store::new(counter());
    let patches = [
        CounterPatch::default().count(4),
        CounterPatch::default().unrelated(9),
        CounterPatch::default().count(-1).unrelated(2),
        CounterPatch::default(),
    ];

    for patch in patches {
        let expected = store.get().merge(patch.clone());
        store.set(patch).unwrap();
        assert_eq!(*store.get(), expected);
    }
}

#[test]
fn three_functional_increments() {
    let store = Store::new(counter());

    for _ in 0..3 {
        store
            .set_with(|s| CounterPatch::default().count(s.count + 1))
            .unwrap();
    }

    assert_eq!(store.get().count, 3);
}

#[test]
fn selector_listener_skips_unrelated_changes() {
    let store = Store::new(counter());
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let _sub = store.subscribe_selected(
        |s: &Counter| s.count,
        move |_prev, _next| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        },
    );

    store.set(CounterPatch::default().unrelated(1)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    store.set(CounterPatch::default().count(1)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn dynamic_state_selector_skips_unrelated_changes() {
    let store = Store::new(json!({"count": 0}));
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let _sub = store.subscribe_selected(
        |s: &Value| s["count"].clone(),
        move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        },
    );

    store.set(object(json!({"unrelated": 1}))).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*store.get(), json!({"count": 0, "unrelated": 1}));
}

#[test]
fn no_notifications_after_unsubscribe() {
    let store = Store::new(counter());
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let sub = store.subscribe(move |_, _| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    sub.unsubscribe();

    for i in 0..5 {
        store.set(CounterPatch::default().count(i)).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn persisted_counter_hydrates_fresh_store() {
    let storage = MemoryStorage::new();
    let build = || {
        Store::builder(|_, _| counter())
            .with(Persist::new(
                PersistOptions::new("counter-storage"),
                storage.clone(),
            ))
            .build()
            .unwrap()
    };

    let store = build();
    store.set(CounterPatch::default().count(5)).unwrap();
    drop(store);

    let fresh = build();
    assert_eq!(fresh.get().count, 5);
}

#[test]
fn file_backed_persistence_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let build = || {
        let storage = FileStorage::new(dir.path()).unwrap();
        Store::builder(|_, _| counter())
            .with(Persist::new(PersistOptions::new("counter-storage"), storage))
            .build()
    };

    build()
        .unwrap()
        .set(CounterPatch::default().count(5).unrelated(8))
        .unwrap();

    let fresh = build().unwrap();
    assert_eq!(
        *fresh.get(),
        Counter {
            count: 5,
            unrelated: 8
        }
    );
}

#[test]
fn corrupt_file_surfaces_read_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("counter-storage.json"), "{ truncated").unwrap();
    let storage = FileStorage::new(dir.path()).unwrap();

    let result = Store::builder(|_, _| counter())
        .with(Persist::new(PersistOptions::new("counter-storage"), storage))
        .build();

    match result {
        Err(StoreError::PersistenceRead { key, .. }) => assert_eq!(key, "counter-storage"),
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[test]
fn actions_defined_in_initializer() {
    struct Actions {
        increment: Box<dyn Fn() -> pantry::Result<()>>,
        reset: Box<dyn Fn() -> pantry::Result<()>>,
    }

    let mut actions = None;
    let store = Store::<Counter>::create(|set, _get| {
        let inc = set.clone();
        let reset = set.clone();
        actions = Some(Actions {
            increment: Box::new(move || {
                inc.set_with(|s| CounterPatch::default().count(s.count + 1))
            }),
            reset: Box::new(move || reset.set(CounterPatch::default().count(0))),
        });
        counter()
    });
    let actions = actions.unwrap();

    (actions.increment)().unwrap();
    (actions.increment)().unwrap();
    assert_eq!(store.get().count, 2);

    (actions.reset)().unwrap();
    assert_eq!(store.get().count, 0);
}

#[test]
fn store_subscription_from_other_thread() {
    let store = Store::new(counter());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let _sub = store.subscribe(move |_prev: &Counter, next: &Counter| {
        seen_clone.lock().unwrap().push(next.count);
    });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                store
                    .set_with(|s| CounterPatch::default().count(s.count + 1))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Racing changes may be folded into a newer one, but the final state is
    // always delivered and nothing is delivered twice.
    assert_eq!(store.get().count, 4);
    let mut seen = seen.lock().unwrap().clone();
    seen.sort_unstable();
    let delivered = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), delivered);
    assert_eq!(seen.last(), Some(&4));
}

#[test]
fn reducer_and_context_together() {
    #[derive(Clone, Debug)]
    enum Action {
        Add(i64),
    }

    let context = StoreContext::new();
    context.provide(Store::new(counter()));

    let store = context.require::<Counter>().unwrap();
    let reducer = Reducer::new(store, |s: &Counter, action: Action| match action {
        Action::Add(n) => s.merge(CounterPatch::default().count(s.count + n)),
    });
    reducer.dispatch(Action::Add(2)).unwrap();
    reducer.dispatch(Action::Add(3)).unwrap();

    assert_eq!(context.require::<Counter>().unwrap().get().count, 5);
}

#[test]
fn listener_mutation_is_what_gets_persisted() {
    let storage = MemoryStorage::new();
    let build = || {
        Store::builder(|_, _| counter())
            .with(Persist::new(
                PersistOptions::new("counter-storage"),
                storage.clone(),
            ))
            .build()
            .unwrap()
    };

    let store = build();
    let inner = store.clone();
    let _sub = store.subscribe(move |prev: &Counter, next: &Counter| {
        if prev.count == 0 && next.count == 1 {
            inner.set(CounterPatch::default().unrelated(7)).unwrap();
        }
    });

    store.set(CounterPatch::default().count(1)).unwrap();

    let expected = Counter {
        count: 1,
        unrelated: 7,
    };
    assert_eq!(*store.get(), expected);
    let raw = storage.get_item("counter-storage").unwrap().unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["state"], json!({"count": 1, "unrelated": 7}));
    drop(store);

    assert_eq!(*build().get(), expected);
}

#[test]
fn selector_stays_current_across_nested_changes() {
    let store = Store::new(counter());
    let inner = store.clone();
    let _bump = store.subscribe(move |prev: &Counter, next: &Counter| {
        if prev.count == 0 && next.count == 1 {
            inner.set(CounterPatch::default().count(2)).unwrap();
        }
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let _count = store.subscribe_selected(|s: &Counter| s.count, {
        let seen = seen.clone();
        move |prev, next| seen.lock().unwrap().push((*prev, *next))
    });

    store.set(CounterPatch::default().count(1)).unwrap();
    store.set(CounterPatch::default().unrelated(3)).unwrap();

    assert_eq!(store.get().count, 2);
    assert_eq!(*seen.lock().unwrap(), vec![(0, 2)]);
}

struct ReadOnlyStorage;

impl StateStorage for ReadOnlyStorage {
    fn get_item(&self, _key: &str) -> std::io::Result<Option<String>> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ))
    }

    fn remove_item(&self, _key: &str) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn failed_write_keeps_new_state_and_notifies() {
    let store = Store::builder(|_, _| counter())
        .with(Persist::new(
            PersistOptions::new("counter-storage"),
            ReadOnlyStorage,
        ))
        .build()
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let _sub = store.subscribe(move |_, _| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    let err = store.set(CounterPatch::default().count(3)).unwrap_err();

    match err {
        StoreError::PersistenceWrite {
            key,
            source: PersistenceError::Storage(io),
        } => {
            assert_eq!(key, "counter-storage");
            assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected a write error, got {other:?}"),
    }
    assert_eq!(store.get().count, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn select_with_identity_equality() {
    #[derive(Clone)]
    struct Feed {
        items: Vec<Arc<String>>,
        head: Arc<String>,
        unread: usize,
    }

    let first = Arc::new("first".to_string());
    let store = Store::new(Feed {
        items: vec![first.clone()],
        head: first.clone(),
        unread: 0,
    });

    let item_changes = Arc::new(AtomicUsize::new(0));
    let _items = store
        .select_with(|f: &Feed| f.items.clone(), |a: &Vec<Arc<String>>, b: &Vec<Arc<String>>| {
            equality::shallow(a, b)
        })
        .subscribe({
            let item_changes = item_changes.clone();
            move |_, _| {
                item_changes.fetch_add(1, Ordering::SeqCst);
            }
        });
    let head_changes = Arc::new(AtomicUsize::new(0));
    let _head = store
        .select_with(|f: &Feed| f.head.clone(), equality::by_ptr)
        .subscribe({
            let head_changes = head_changes.clone();
            move |_, _| {
                head_changes.fetch_add(1, Ordering::SeqCst);
            }
        });

    // New vector, same allocations: no change under identity.
    store.update(|f| f.unread += 1).unwrap();
    assert_eq!(item_changes.load(Ordering::SeqCst), 0);
    assert_eq!(head_changes.load(Ordering::SeqCst), 0);

    // Equal contents in a new allocation still count as a change.
    store
        .update(|f| f.head = Arc::new("first".to_string()))
        .unwrap();
    assert_eq!(head_changes.load(Ordering::SeqCst), 1);

    store
        .update(|f| f.items.push(Arc::new("second".to_string())))
        .unwrap();
    assert_eq!(item_changes.load(Ordering::SeqCst), 1);
    assert_eq!(head_changes.load(Ordering::SeqCst), 1);
}
