//! Trip and outcome-classification policies.
//!
//! Policies must be cheap, side-effect free functions of their argument; trip
//! policies run while the breaker's lock is held. Any
//! `Fn(&Counts) -> bool` closure is a [`TripPolicy`] and any
//! `Fn(&(dyn Error + 'static)) -> bool` closure is a [`SuccessPolicy`].

use crate::counts::Counts;
use std::error::Error;

/// Decides when a closed breaker should trip open.
pub trait TripPolicy: Send + Sync + 'static {
    /// Called after every failure recorded in the closed state.
    fn ready_to_trip(&self, counts: &Counts) -> bool;
}

impl<F> TripPolicy for F
where
    F: Fn(&Counts) -> bool + Send + Sync + 'static,
{
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        self(counts)
    }
}

/// Decides whether an operation error counts against the breaker.
///
/// Successful operations are always successes; only errors are classified.
pub trait SuccessPolicy: Send + Sync + 'static {
    /// Returns true if `error` should be recorded as a success.
    fn is_successful(&self, error: &(dyn Error + 'static)) -> bool;
}

impl<F> SuccessPolicy for F
where
    F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
{
    fn is_successful(&self, error: &(dyn Error + 'static)) -> bool {
        self(error)
    }
}

/// Trips once a run of consecutive failures reaches the threshold.
#[derive(Debug, Clone, Copy)]
pub struct ConsecutiveFailures {
    threshold: u32,
}

impl ConsecutiveFailures {
    /// Creates a policy tripping at `threshold` consecutive failures.
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl Default for ConsecutiveFailures {
    /// More than five consecutive failures.
    fn default() -> Self {
        Self::new(6)
    }
}

impl TripPolicy for ConsecutiveFailures {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.consecutive_failures() >= self.threshold
    }
}

/// Trips when the failure ratio reaches `ratio` over at least `min_requests` calls.
#[derive(Debug, Clone, Copy)]
pub struct FailureRatio {
    min_requests: u32,
    ratio: f64,
}

impl FailureRatio {
    /// Creates a ratio policy.
    pub fn new(min_requests: u32, ratio: f64) -> Self {
        Self {
            min_requests,
            ratio,
        }
    }
}

impl TripPolicy for FailureRatio {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.requests() >= self.min_requests && counts.failure_ratio() >= self.ratio
    }
}

/// Classifies every error as a failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllErrorsFail;

impl SuccessPolicy for AllErrorsFail {
    fn is_successful(&self, _error: &(dyn Error + 'static)) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failures(n: u32) -> Counts {
        let mut counts = Counts::new();
        for _ in 0..n {
            counts.on_failure();
        }
        counts
    }

    #[test]
    fn default_consecutive_failures_trips_after_five() {
        let policy = ConsecutiveFailures::default();
        assert!(!policy.ready_to_trip(&failures(5)));
        assert!(policy.ready_to_trip(&failures(6)));
    }

    #[test]
    fn failure_ratio_needs_minimum_volume() {
        let policy = FailureRatio::new(4, 0.6);
        assert!(!policy.ready_to_trip(&failures(3)));
        assert!(policy.ready_to_trip(&failures(4)));

        let mut counts = failures(2);
        counts.on_success();
        counts.on_success();
        assert!(!policy.ready_to_trip(&counts));
    }

    #[test]
    fn closures_are_policies() {
        let trip = |counts: &Counts| counts.total_failures() > 1;
        assert!(!trip.ready_to_trip(&failures(1)));
        assert!(trip.ready_to_trip(&failures(2)));
    }
}
