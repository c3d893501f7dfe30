//! Advanced Circuit Breaker Example
//!
//! This example demonstrates:
//! 1. One hook registry shared by every breaker of a manager
//! 2. A success policy that ignores expected domain errors
//! 3. The two-step admission protocol for calls that cannot be wrapped in a closure
//! 4. Reporting breaker states, e.g. from a health endpoint

use breakerhub::{
    BreakerError, ConsecutiveFailures, HookRegistry, Manager, Rejection, Settings,
};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
enum ApiError {
    NotFound,
    Unavailable(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "resource not found"),
            ApiError::Unavailable(msg) => write!(f, "service unavailable: {}", msg),
        }
    }
}

impl Error for ApiError {}

// Simulates an external API: a few lookups miss, then the service goes down for a while
fn fetch_user(attempt: u32) -> Result<String, ApiError> {
    match attempt {
        1..=2 => Ok(format!("user-{}", attempt)),
        3 => Err(ApiError::NotFound),
        4..=7 => Err(ApiError::Unavailable("upstream timeout".to_string())),
        _ => Ok(format!("user-{}", attempt)),
    }
}

fn main() {
    println!("=== Advanced Circuit Breaker Example ===\n");

    // 1. Set up a hook registry for observability
    let hooks = Arc::new(HookRegistry::new());
    hooks.set_on_state_change(|name, from, to| println!("[{}] {} -> {}", name, from, to));
    hooks.set_on_reject(|name, rejection| match rejection {
        Rejection::Open => println!("[{}] rejected, breaker open", name),
        Rejection::TooManyRequests => println!("[{}] rejected, trial quota used", name),
    });

    // 2. A missing user is an answer, not an outage
    let settings = Settings::builder()
        .max_requests(2)
        .timeout(Duration::from_secs(2))
        .ready_to_trip(ConsecutiveFailures::new(3))
        .is_successful(|err: &(dyn Error + 'static)| {
            matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound))
        })
        .shared_hooks(Arc::clone(&hooks))
        .build();

    let manager = Manager::new();
    let api = manager.get_or_create("user-api", settings);

    for attempt in 1..=12 {
        println!("\n--- Call {} ---", attempt);

        match api.call(|| fetch_user(attempt)) {
            Ok(user) => println!("fetched {}", user),
            Err(BreakerError::Operation(err)) => println!("api error: {}", err),
            Err(err) => println!("not attempted: {}", err),
        }

        println!(
            "state={}, counts={:?}",
            api.state(),
            api.counts()
        );

        thread::sleep(Duration::from_millis(500));
    }

    // 3. Two-step usage: admit, run elsewhere, report back
    let ledger = manager.get_or_create(
        "ledger",
        Settings::builder().shared_hooks(Arc::clone(&hooks)).build(),
    );
    match ledger.before_call() {
        Ok(generation) => {
            let outcome: Result<(), ApiError> = Ok(());
            ledger.after_call(generation, outcome.as_ref().err().map(|e| e as &(dyn Error + 'static)));
        }
        Err(rejection) => println!("ledger call skipped: {}", rejection),
    }

    // 4. Health summary
    println!();
    for (name, state) in manager.states() {
        println!("{:<10} {}", name, state);
    }

    println!("\n=== Example Completed ===");
}
