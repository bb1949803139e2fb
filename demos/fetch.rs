//! Loading data in the background
//!
//! The store never waits on anything. The caller does the slow work on its own
//! thread and records each step with `set`.

use std::thread;
use std::time::Duration;

use pantry::{state, Store};

#[derive(Clone, Debug, PartialEq)]
enum Status {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

state! {
    #[derive(Clone, Debug)]
    struct Fishes => FishesPatch {
        status: Status,
        names: Vec<String>,
    }
}

fn fetch_fishes(fail: bool) -> Result<Vec<String>, String> {
    thread::sleep(Duration::from_millis(50));
    if fail {
        return Err("pond unreachable".to_string());
    }
    Ok(vec!["carp".to_string(), "pike".to_string(), "perch".to_string()])
}

fn load(store: Store<Fishes>, fail: bool) -> thread::JoinHandle<pantry::Result<()>> {
    thread::spawn(move || {
        store.set(FishesPatch::default().status(Status::Loading))?;
        match fetch_fishes(fail) {
            Ok(names) => store.set(FishesPatch::default().names(names).status(Status::Ready)),
            Err(reason) => store.set(FishesPatch::default().status(Status::Failed(reason))),
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Background Fetch Example ===\n");

    let store = Store::new(Fishes {
        status: Status::Idle,
        names: Vec::new(),
    });

    let _status = store.subscribe_selected(
        |state: &Fishes| state.status.clone(),
        |prev, next| println!("Status: {prev:?} -> {next:?}"),
    );

    load(store.clone(), false)
        .join()
        .map_err(|_| "fetch thread panicked")??;
    println!("Fishes: {:?}\n", store.get().names);

    load(store.clone(), true)
        .join()
        .map_err(|_| "fetch thread panicked")??;
    println!("Fishes still cached: {:?}", store.get().names);

    Ok(())
}
