use breakerhub::{BreakerError, FailureRatio, Manager, Settings};
use std::error::Error;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Custom error type that implements Error trait
#[derive(Debug)]
struct ServiceError(String);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "breakerhub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Breakers created through `execute` use these settings
    let manager = Manager::with_defaults(
        Settings::builder()
            .max_requests(1)
            .timeout(Duration::from_secs(2))
            .ready_to_trip(FailureRatio::new(4, 0.6))
            .build(),
    );

    let mut calls = 0u32;
    let mut query_database = || -> Result<String, ServiceError> {
        calls += 1;
        if (4..=8).contains(&calls) {
            Err(ServiceError("connection refused".to_string()))
        } else {
            Ok(format!("row {}", calls))
        }
    };

    for i in 1..=15 {
        println!("\nAttempt {}: ", i);

        match manager.execute("postgres", &mut query_database) {
            Ok(row) => println!("Query returned: {}", row),
            Err(BreakerError::Open) => {
                println!("Breaker is open, waiting before retry...");
                thread::sleep(Duration::from_secs(1));
            }
            Err(BreakerError::TooManyRequests) => println!("Breaker is probing, call skipped"),
            Err(BreakerError::Operation(err)) => println!("Query failed: {}", err),
        }

        // Cache calls go through their own breaker and never see the database's failures
        let _ = manager.execute("redis", || -> Result<(), ServiceError> { Ok(()) });

        for (name, state) in manager.states() {
            println!("  {}: {}", name, state);
        }

        thread::sleep(Duration::from_millis(300));
    }
}
