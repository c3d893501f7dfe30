//! # breakerhub
//!
//! Named circuit breakers for the dependencies of a service, handed out by a
//! concurrent get-or-create registry.
//!
//! Wrap every call to an external dependency (a database, a cache, an HTTP
//! API) in the breaker for that dependency. When the dependency keeps failing
//! the breaker trips and rejects calls immediately instead of letting them
//! pile up, then lets a few trial calls through once its timeout has passed.
//!
//! ## States
//!
//! - **Closed**: Normal operation. Outcomes are counted, and the trip policy
//!   is consulted after every failure.
//! - **Open**: Calls are rejected with [`BreakerError::Open`] until the
//!   timeout elapses.
//! - **Half-Open**: Up to `max_requests` trial calls are admitted; more are
//!   rejected with [`BreakerError::TooManyRequests`]. `max_requests`
//!   consecutive successes close the breaker, a single failure re-opens it.
//!
//! Each state change (and each periodic reset of the closed-state counts)
//! starts a new *generation*. A call reports its outcome against the
//! generation it was admitted in, and outcomes from older generations are
//! ignored.
//!
//! ## Basic Usage
//!
//! ```rust
//! use breakerhub::{BreakerError, FailureRatio, Manager, Settings};
//! use std::error::Error;
//! use std::fmt;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct DbError(String);
//!
//! impl fmt::Display for DbError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "database error: {}", self.0)
//!     }
//! }
//!
//! impl Error for DbError {}
//!
//! let manager = Manager::new();
//!
//! let settings = Settings::builder()
//!     .max_requests(1)
//!     .timeout(Duration::from_secs(5))
//!     .ready_to_trip(FailureRatio::new(4, 0.6))
//!     .build();
//! let db = manager.get_or_create("postgres", settings);
//!
//! match db.call(|| -> Result<u64, DbError> { Ok(42) }) {
//!     Ok(rows) => println!("query returned {}", rows),
//!     Err(BreakerError::Open) => println!("database breaker is open"),
//!     Err(BreakerError::TooManyRequests) => println!("database is being probed"),
//!     Err(BreakerError::Operation(err)) => println!("query failed: {}", err),
//! }
//! ```
//!
//! ## Async Support
//!
//! With the `async` feature enabled, breakers also wrap futures:
//!
//! ```rust,ignore
//! let result = manager
//!     .execute_async("redis", || async { cache.get("key").await })
//!     .await;
//! ```
//!
//! ## Features
//!
//! - `std` - Standard library support (default)
//! - `async` - Async support with Tokio
//! - `prometheus` - Prometheus metrics integration

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod clock;
mod config;
mod counts;
mod error;
mod hook;
mod manager;
mod metrics;
mod policy;
pub mod prelude;
mod state;

// Re-exports
pub use breaker::Breaker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Settings, SettingsBuilder, DEFAULT_TIMEOUT};
pub use counts::Counts;
pub use error::{BreakerError, BreakerResult, Rejection};
pub use hook::HookRegistry;
pub use manager::Manager;
#[cfg(feature = "prometheus")]
pub use metrics::PrometheusSink;
pub use metrics::{MetricSink, NullMetricSink};
pub use policy::{AllErrorsFail, ConsecutiveFailures, FailureRatio, SuccessPolicy, TripPolicy};
pub use state::State;
