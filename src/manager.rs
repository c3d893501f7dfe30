//! Registry of named circuit breakers.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::RwLock;

use crate::breaker::Breaker;
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::BreakerResult;
use crate::state::State;

/// A concurrent registry handing out one shared [`Breaker`] per name.
///
/// The manager is an ordinary value: construct one at startup, wrap it in an
/// `Arc` and pass it to whatever needs breakers. Breakers live as long as the
/// manager and are never removed.
pub struct Manager {
    breakers: RwLock<HashMap<String, Arc<Breaker>, RandomState>>,
    defaults: Settings,
    clock: Arc<dyn Clock>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Creates an empty manager using the system clock and default settings.
    pub fn new() -> Self {
        Self::with_clock_and_defaults(Arc::new(SystemClock), Settings::default())
    }

    /// Creates an empty manager whose breakers read time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_clock_and_defaults(clock, Settings::default())
    }

    /// Creates an empty manager whose [`execute`](Self::execute) creates
    /// breakers with `defaults`.
    pub fn with_defaults(defaults: Settings) -> Self {
        Self::with_clock_and_defaults(Arc::new(SystemClock), defaults)
    }

    /// Creates an empty manager with an explicit clock and default settings.
    pub fn with_clock_and_defaults(clock: Arc<dyn Clock>, defaults: Settings) -> Self {
        Self {
            breakers: RwLock::new(HashMap::with_hasher(RandomState::new())),
            defaults,
            clock,
        }
    }

    /// Settings used when a breaker is created implicitly.
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Returns the breaker called `name`, creating it with `settings` if needed.
    ///
    /// `settings` only applies on first creation; later calls get the existing
    /// breaker unchanged.
    pub fn get_or_create(&self, name: &str, settings: Settings) -> Arc<Breaker> {
        if let Some(breaker) = self.breakers.read().get(name) {
            return Arc::clone(breaker);
        }

        let mut breakers = self.breakers.write();
        // Another thread may have created it between the two locks.
        if let Some(breaker) = breakers.get(name) {
            return Arc::clone(breaker);
        }

        let breaker = Arc::new(Breaker::with_clock(
            name,
            settings,
            Arc::clone(&self.clock),
        ));
        breakers.insert(name.to_owned(), Arc::clone(&breaker));
        drop(breakers);

        tracing::debug!(breaker = name, settings = ?breaker.settings(), "circuit breaker created");
        breaker
    }

    /// Returns the breaker called `name` if it exists.
    pub fn get(&self, name: &str) -> Option<Arc<Breaker>> {
        self.breakers.read().get(name).cloned()
    }

    /// Runs `f` through the breaker called `name`, creating it with the
    /// manager's default settings if needed.
    pub fn execute<F, T, E>(&self, name: &str, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + 'static,
    {
        self.execute_with(name, self.defaults.clone(), f)
    }

    /// Runs `f` through the breaker called `name`, creating it with `settings`
    /// if needed.
    pub fn execute_with<F, T, E>(&self, name: &str, settings: Settings, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + 'static,
    {
        self.get_or_create(name, settings).call(f)
    }

    /// Number of registered breakers.
    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    /// Returns true if no breaker has been created yet.
    pub fn is_empty(&self) -> bool {
        self.breakers.read().is_empty()
    }

    /// Names of all registered breakers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Current state of every registered breaker, sorted by name.
    pub fn states(&self) -> Vec<(String, State)> {
        // Snapshot first so no breaker lock is taken under the registry lock.
        let breakers: Vec<Arc<Breaker>> = self.breakers.read().values().cloned().collect();

        let mut states: Vec<(String, State)> = breakers
            .iter()
            .map(|breaker| (breaker.name().to_owned(), breaker.state()))
            .collect();
        states.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        states
    }
}

#[cfg(feature = "async")]
impl Manager {
    /// Runs the future produced by `f` through the breaker called `name`,
    /// creating it with the manager's default settings if needed.
    pub async fn execute_async<F, Fut, T, E>(&self, name: &str, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Error + 'static,
    {
        let breaker = self.get_or_create(name, self.defaults.clone());
        breaker.call_async(f).await
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("breakers", &self.names())
            .field("defaults", &self.defaults)
            .finish()
    }
}
