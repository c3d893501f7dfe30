//! Core circuit breaker implementation.

use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::counts::Counts;
use crate::error::{BreakerError, BreakerResult, Rejection};
use crate::state::State;

/// A named circuit breaker guarding one dependency.
///
/// Admission and completion are two short critical sections around the
/// protected call; the call itself runs without any lock held. Each admission
/// hands out the generation it was admitted in, and a completion whose
/// generation no longer matches is dropped so it cannot leak into the counts
/// of a newer generation.
pub struct Breaker {
    name: String,
    settings: Settings,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

/// Mutable breaker state, only touched under the breaker lock.
#[derive(Debug)]
struct Inner {
    state: State,
    generation: u64,
    counts: Counts,
    // Calls admitted in this generation, bounds half-open trials.
    admitted: u32,
    expiry: Option<Instant>,
}

/// A state change observed under the lock and reported after it is released.
#[derive(Debug, Clone, Copy)]
struct Transition {
    from: State,
    to: State,
    generation: u64,
}

/// `now + by`, clamped to the latest instant the platform can represent.
fn saturating_add(now: Instant, by: Duration) -> Instant {
    let mut by = by;
    loop {
        if let Some(instant) = now.checked_add(by) {
            return instant;
        }
        by /= 2;
    }
}

impl Inner {
    fn new(now: Instant, settings: &Settings) -> Self {
        let mut inner = Self {
            state: State::Closed,
            generation: 0,
            counts: Counts::new(),
            admitted: 0,
            expiry: None,
        };
        inner.expiry = inner.expiry_for(State::Closed, now, settings);
        inner
    }

    fn expiry_for(&self, state: State, now: Instant, settings: &Settings) -> Option<Instant> {
        match state {
            State::Closed if settings.interval.is_zero() => None,
            // An interval past the end of representable time never clears.
            State::Closed => now.checked_add(settings.interval),
            State::Open => Some(saturating_add(now, settings.timeout)),
            State::HalfOpen => None,
        }
    }

    fn new_generation(&mut self, now: Instant, settings: &Settings) {
        self.generation = self.generation.wrapping_add(1);
        self.counts.clear();
        self.admitted = 0;
        self.expiry = self.expiry_for(self.state, now, settings);
    }

    fn set_state(&mut self, to: State, now: Instant, settings: &Settings) -> Option<Transition> {
        if self.state == to {
            return None;
        }

        let from = self.state;
        self.state = to;
        self.new_generation(now, settings);

        Some(Transition {
            from,
            to,
            generation: self.generation,
        })
    }

    /// Applies the transitions that are due purely because time has passed.
    fn advance(&mut self, now: Instant, settings: &Settings) -> Option<Transition> {
        match (self.state, self.expiry) {
            (State::Closed, Some(expiry)) if now >= expiry => {
                self.new_generation(now, settings);
                None
            }
            (State::Open, Some(expiry)) if now >= expiry => {
                self.set_state(State::HalfOpen, now, settings)
            }
            _ => None,
        }
    }

    fn admit(&mut self, settings: &Settings) -> Result<u64, Rejection> {
        match self.state {
            State::Open => Err(Rejection::Open),
            State::HalfOpen if self.admitted >= settings.max_requests => {
                Err(Rejection::TooManyRequests)
            }
            State::Closed | State::HalfOpen => {
                self.admitted = self.admitted.saturating_add(1);
                Ok(self.generation)
            }
        }
    }

    fn on_success(&mut self, now: Instant, settings: &Settings) -> Option<Transition> {
        self.counts.on_success();

        if self.state == State::HalfOpen
            && self.counts.consecutive_successes() >= settings.max_requests
        {
            return self.set_state(State::Closed, now, settings);
        }

        None
    }

    fn on_failure(&mut self, now: Instant, settings: &Settings) -> Option<Transition> {
        self.counts.on_failure();

        match self.state {
            State::Closed if settings.ready_to_trip.ready_to_trip(&self.counts) => {
                self.set_state(State::Open, now, settings)
            }
            State::HalfOpen => self.set_state(State::Open, now, settings),
            _ => None,
        }
    }
}

impl Breaker {
    /// Creates a breaker driven by the system clock.
    pub fn new(name: impl Into<String>, settings: Settings) -> Self {
        Self::with_clock(name, settings, Arc::new(SystemClock))
    }

    /// Creates a breaker driven by `clock`.
    pub fn with_clock(name: impl Into<String>, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        let settings = settings.normalized();
        let inner = Inner::new(clock.now(), &settings);

        Self {
            name: name.into(),
            settings,
            clock,
            inner: Mutex::new(inner),
        }
    }

    /// Name the breaker was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective settings, with zero values already replaced by defaults.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the current state, applying any transition that is due.
    pub fn state(&self) -> State {
        let now = self.clock.now();
        let (state, transition) = {
            let mut inner = self.inner.lock();
            let transition = inner.advance(now, &self.settings);
            (inner.state, transition)
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }

        state
    }

    /// Snapshot of the counts of the current generation.
    pub fn counts(&self) -> Counts {
        self.inner.lock().counts
    }

    /// Current generation number.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Asks the breaker to admit one call.
    ///
    /// On success returns the generation to hand back to
    /// [`after_call`](Self::after_call) once the call has finished. Every
    /// admitted call must be completed exactly once.
    pub fn before_call(&self) -> Result<u64, Rejection> {
        let now = self.clock.now();
        let (admission, transition) = {
            let mut inner = self.inner.lock();
            let transition = inner.advance(now, &self.settings);
            (inner.admit(&self.settings), transition)
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }

        if let Err(rejection) = admission {
            tracing::trace!(breaker = %self.name, reason = rejection.as_str(), "call rejected");
            self.settings
                .hooks
                .execute_reject_hook(&self.name, rejection);
            self.settings
                .metric_sink
                .record_rejection(&self.name, rejection);
        }

        admission
    }

    /// Reports the outcome of a call admitted in `generation`.
    ///
    /// `None` is a success; an error is classified by the breaker's success
    /// policy.
    pub fn after_call(&self, generation: u64, error: Option<&(dyn Error + 'static)>) {
        let success = match error {
            None => true,
            Some(error) => self.settings.is_successful.is_successful(error),
        };
        self.record(generation, success);
    }

    /// Records a success for `generation` without classification.
    ///
    /// Passing the generation of an open breaker (see
    /// [`generation`](Self::generation)) updates its counts, which nothing
    /// reads while open; the next transition replaces them.
    pub fn record_success(&self, generation: u64) {
        self.record(generation, true);
    }

    /// Records a failure for `generation` without classification.
    ///
    /// As with [`record_success`](Self::record_success), a failure recorded
    /// against an open generation only touches counts that are discarded on
    /// the next transition; it never moves the expiry.
    pub fn record_failure(&self, generation: u64) {
        self.record(generation, false);
    }

    fn record(&self, generation: u64, success: bool) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.inner.lock();
            let expired = inner.advance(now, &self.settings);

            if inner.generation != generation {
                drop(inner);
                tracing::debug!(
                    breaker = %self.name,
                    generation,
                    success,
                    "discarding completion from a previous generation"
                );
                expired
            } else if success {
                inner.on_success(now, &self.settings)
            } else {
                inner.on_failure(now, &self.settings)
            }
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    fn notify(&self, transition: Transition) {
        let Transition {
            from,
            to,
            generation,
        } = transition;

        if to == State::Open {
            tracing::warn!(breaker = %self.name, %from, %to, generation, "circuit breaker opened");
        } else {
            tracing::info!(breaker = %self.name, %from, %to, generation, "circuit breaker state changed");
        }

        self.settings
            .hooks
            .execute_state_transition_hook(&self.name, from, to);
        self.settings
            .metric_sink
            .record_state_transition(&self.name, from, to);
    }

    fn classify<T, E>(&self, result: &Result<T, E>) -> bool
    where
        E: Error + 'static,
    {
        match result {
            Ok(_) => true,
            Err(error) => self.settings.is_successful.is_successful(error),
        }
    }

    /// Executes a function wrapped by the circuit breaker.
    ///
    /// A panic inside `f` is recorded as a failure and then resumed.
    pub fn call<F, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + 'static,
    {
        let generation = self.before_call()?;

        let start = Instant::now();
        let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(payload) => {
                self.record(generation, false);
                self.settings
                    .metric_sink
                    .record_call(&self.name, false, start.elapsed());
                panic::resume_unwind(payload);
            }
        };
        let duration = start.elapsed();

        let success = self.classify(&result);
        self.record(generation, success);
        self.settings
            .metric_sink
            .record_call(&self.name, success, duration);

        result.map_err(BreakerError::Operation)
    }
}

// Implement Async support when the feature is enabled
#[cfg(feature = "async")]
impl Breaker {
    /// Executes an async function wrapped by the circuit breaker.
    ///
    /// A panic while creating or polling the future is recorded as a failure
    /// and then resumed. Dropping the returned future after admission leaves
    /// the call unreported.
    pub async fn call_async<F, Fut, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Error + 'static,
    {
        use futures::FutureExt;

        let generation = self.before_call()?;

        let start = Instant::now();
        let result = match AssertUnwindSafe(async move { f().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                self.record(generation, false);
                self.settings
                    .metric_sink
                    .record_call(&self.name, false, start.elapsed());
                panic::resume_unwind(payload);
            }
        };
        let duration = start.elapsed();

        let success = self.classify(&result);
        self.record(generation, success);
        self.settings
            .metric_sink
            .record_call(&self.name, success, duration);

        result.map_err(BreakerError::Operation)
    }
}

impl fmt::Debug for Breaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Breaker")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .field("counts", &inner.counts)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn breaker(settings: Settings) -> (Breaker, ManualClock) {
        let clock = ManualClock::new();
        let breaker = Breaker::with_clock("test", settings, Arc::new(clock.clone()));
        (breaker, clock)
    }

    #[test]
    fn starts_closed_in_generation_zero() {
        let (breaker, _) = breaker(Settings::default());
        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.generation(), 0);
        assert_eq!(breaker.counts(), Counts::new());
    }

    #[test]
    fn interval_rolls_closed_generation() {
        let settings = Settings::builder()
            .interval(Duration::from_secs(10))
            .build();
        let (breaker, clock) = breaker(settings);

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);
        assert_eq!(breaker.counts().total_failures(), 1);

        clock.advance(Duration::from_secs(10));
        let next = breaker.before_call().unwrap();
        assert_eq!(next, generation + 1);
        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.counts(), Counts::new());
    }

    #[test]
    fn zero_interval_never_clears() {
        let (breaker, clock) = breaker(Settings::default());

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);
        clock.advance(Duration::from_secs(3600));

        assert_eq!(breaker.before_call().unwrap(), generation);
        assert_eq!(breaker.counts().total_failures(), 1);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let settings = Settings::builder()
            .interval(Duration::from_secs(1))
            .build();
        let (breaker, clock) = breaker(settings);

        let stale = breaker.before_call().unwrap();
        clock.advance(Duration::from_secs(1));
        let current = breaker.before_call().unwrap();
        assert_ne!(stale, current);

        breaker.record_failure(stale);
        assert_eq!(breaker.counts(), Counts::new());

        breaker.record_failure(current);
        assert_eq!(breaker.counts().total_failures(), 1);
    }

    #[test]
    fn unbounded_interval_never_clears() {
        let settings = Settings::builder().interval(Duration::MAX).build();
        let (breaker, clock) = breaker(settings);

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);
        clock.advance(Duration::from_secs(365 * 24 * 3600));

        assert_eq!(breaker.before_call().unwrap(), generation);
        assert_eq!(breaker.counts().total_failures(), 1);
    }

    #[test]
    fn unbounded_timeout_stays_open() {
        let settings = Settings::builder()
            .timeout(Duration::MAX)
            .ready_to_trip(|counts: &Counts| counts.total_failures() >= 1)
            .build();
        let (breaker, clock) = breaker(settings);

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);
        assert_eq!(breaker.state(), State::Open);
        assert!(breaker.inner.lock().expiry.is_some());

        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(breaker.before_call(), Err(Rejection::Open));
        assert_eq!(breaker.state(), State::Open);
    }

    #[test]
    fn outcome_recorded_against_open_generation_keeps_expiry() {
        let settings = Settings::builder()
            .timeout(Duration::from_secs(5))
            .ready_to_trip(|counts: &Counts| counts.total_failures() >= 1)
            .build();
        let (breaker, clock) = breaker(settings);

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);
        let open = breaker.generation();
        let expiry = breaker.inner.lock().expiry;

        breaker.record_failure(open);
        breaker.record_success(open);
        assert_eq!(breaker.state(), State::Open);
        assert_eq!(breaker.generation(), open);
        assert_eq!(breaker.inner.lock().expiry, expiry);

        clock.advance(Duration::from_secs(5));
        assert!(breaker.before_call().is_ok());
        assert_eq!(breaker.state(), State::HalfOpen);
        assert_eq!(breaker.counts(), Counts::new());
    }

    #[test]
    fn zero_timeout_uses_default() {
        let settings = Settings::builder()
            .timeout(Duration::ZERO)
            .ready_to_trip(|counts: &Counts| counts.total_failures() >= 1)
            .build();
        let (breaker, clock) = breaker(settings);

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);
        assert_eq!(breaker.state(), State::Open);

        clock.advance(Duration::from_secs(59));
        assert_eq!(breaker.before_call(), Err(Rejection::Open));

        clock.advance(Duration::from_secs(1));
        assert!(breaker.before_call().is_ok());
        assert_eq!(breaker.state(), State::HalfOpen);
    }
}
