//! Re-exports the types most call sites need.
//!
//! # Example
//! ```rust,no_run
//! use breakerhub::prelude::*;
//!
//! let manager = Manager::new();
//! let breaker = manager.get_or_create("api", Settings::default());
//! assert_eq!(breaker.state(), State::Closed);
//! ```

pub use crate::{
    Breaker, BreakerError, BreakerResult, Counts, Manager, Rejection, Settings, State,
    SuccessPolicy, TripPolicy,
};
