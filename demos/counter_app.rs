//! Complete counter application demonstrating all features together

use pantry::{state, Reducer, Store, StoreContext, Trace};

state! {
    #[derive(Clone, Debug)]
    struct CounterState => CounterPatch {
        count: i32,
        step: i32,
        history: Vec<i32>,
    }
}

impl CounterState {
    fn new() -> Self {
        Self {
            count: 0,
            step: 1,
            history: vec![0],
        }
    }

    fn with_count(&self, count: i32) -> Self {
        let mut next = self.clone();
        next.count = count;
        next.history.push(count);
        next
    }
}

enum Action {
    Increment,
    Decrement,
    Reset,
    SetStep(i32),
}

fn reduce(state: &CounterState, action: Action) -> CounterState {
    match action {
        Action::Increment => state.with_count(state.count + state.step),
        Action::Decrement => state.with_count(state.count - state.step),
        Action::Reset => state.with_count(0),
        Action::SetStep(step) => {
            let mut next = state.clone();
            next.step = step;
            next
        }
    }
}

fn main() -> pantry::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Complete Counter Application ===\n");

    // The application owns its stores; nothing is global
    println!("1. Initializing counter store");
    let context = StoreContext::new();
    context.provide(
        Store::builder(|_, _| CounterState::new())
            .with(Trace::new("counter"))
            .build()?,
    );

    let store = context.require::<CounterState>()?;

    // Setup a subscriber to log changes
    let _log = store.subscribe(|_prev, state: &CounterState| {
        println!("   [State] Count: {}, Step: {}", state.count, state.step);
    });

    // Derived values through selector subscriptions
    println!("\n2. Watching derived values");
    let _sign = store
        .select(|state: &CounterState| state.count > 0)
        .fire_immediately()
        .subscribe(|_, positive| println!("   Positive: {positive}"));
    let _parity = store.subscribe_selected(
        |state: &CounterState| state.count % 2 == 0,
        |_, even| println!("   Even: {even}"),
    );

    // Drive the store with actions
    let counter = Reducer::new(store.clone(), reduce);

    println!("\n3. Incrementing...");
    for _ in 0..3 {
        counter.dispatch(Action::Increment)?;
    }

    println!("\n4. Changing step size to 5");
    counter.dispatch(Action::SetStep(5))?;

    println!("\n5. Incrementing with new step...");
    counter.dispatch(Action::Increment)?;

    println!("\n6. Decrementing...");
    for _ in 0..3 {
        counter.dispatch(Action::Decrement)?;
    }

    println!("\n7. History:");
    store.read(|state| println!("   {:?}", state.history));

    println!("\n8. Resetting...");
    counter.dispatch(Action::Reset)?;
    store.set(CounterPatch::default().step(1))?;

    println!("\n9. Final history:");
    store.read(|state| println!("   {:?}", state.history));

    println!("\nCounter application complete!");
    Ok(())
}
