//! Store example with complex state

use pantry::{state, Store};

#[derive(Clone, Debug)]
struct TodoItem {
    id: usize,
    text: String,
    completed: bool,
}

state! {
    #[derive(Clone, Debug)]
    struct AppState => AppPatch {
        todos: Vec<TodoItem>,
        filter: String,
    }
}

fn main() -> pantry::Result<()> {
    println!("=== Store Example ===\n");

    // Create a store with initial state
    let store = Store::new(AppState {
        todos: vec![],
        filter: "all".to_string(),
    });

    // Subscribe to state changes
    let _all = store.subscribe(|_prev, state: &AppState| {
        println!(
            "State updated! Active todos: {}",
            state.todos.iter().filter(|t| !t.completed).count()
        );
    });

    // Only hear about filter changes
    let _filter = store.subscribe_selected(
        |state: &AppState| state.filter.clone(),
        |prev, next| println!("Filter changed: {prev} -> {next}"),
    );

    // Add a todo
    println!("Adding todo...");
    store.update(|state| {
        state.todos.push(TodoItem {
            id: 1,
            text: "Learn Pantry".to_string(),
            completed: false,
        });
    })?;

    // Complete the todo
    println!("\nCompleting todo...");
    store.update(|state| {
        if let Some(todo) = state.todos.first_mut() {
            todo.completed = true;
        }
    })?;

    // Switch the filter with a partial update
    println!("\nShowing completed todos...");
    store.set(AppPatch::default().filter("completed".to_string()))?;

    // Read final state
    println!("\nFinal state: {:#?}", store.get());
    store.read(|state| {
        for todo in &state.todos {
            println!("  #{} {} (done: {})", todo.id, todo.text, todo.completed);
        }
    });

    Ok(())
}
