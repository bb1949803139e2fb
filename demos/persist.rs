//! Persisting a store to disk and restoring it on the next run

use pantry::persist::{FileStorage, Persist, PersistOptions};
use pantry::{state, Store};
use serde::{Deserialize, Serialize};

state! {
    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Preferences => PreferencesPatch {
        theme: String,
        font_size: u32,
        #[serde(skip)]
        unsaved_draft: String,
    }
}

fn preferences() -> Preferences {
    Preferences {
        theme: "light".to_string(),
        font_size: 14,
        unsaved_draft: String::new(),
    }
}

fn open(storage: &FileStorage) -> pantry::Result<(Store<Preferences>, Persist<Preferences>)> {
    let persist = Persist::new(
        PersistOptions::new("preferences")
            .version(1)
            .recover_corrupt(),
        storage.clone(),
    );
    let store = Store::builder(|_, _| preferences())
        .with(persist.clone())
        .build()?;
    Ok((store, persist))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Persistence Example ===\n");

    let dir = std::env::temp_dir().join("pantry-demo");
    let storage = FileStorage::new(&dir)?;
    println!("Storing state in {}", storage.dir().display());

    println!("\n1. First run");
    let (store, _) = open(&storage)?;
    println!("   Loaded: {:?}", store.get());
    store.set(
        PreferencesPatch::default()
            .theme("dark".to_string())
            .font_size(16)
            .unsaved_draft("not persisted".to_string()),
    )?;
    println!("   Saved:  {:?}", store.get());
    drop(store);

    println!("\n2. Second run");
    let (store, persist) = open(&storage)?;
    println!("   Hydrated: {}", persist.has_hydrated());
    println!("   Loaded:   {:?}", store.get());

    println!("\n3. Clearing storage");
    persist.clear_storage()?;
    let (store, _) = open(&storage)?;
    println!("   Loaded after clear: {:?}", store.get());

    Ok(())
}
