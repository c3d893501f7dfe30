//! Configuration for circuit breakers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::policy::{AllErrorsFail, ConsecutiveFailures, SuccessPolicy, TripPolicy};

/// Timeout applied when an open breaker is configured with a zero timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings a breaker is created with.
///
/// Cloning is cheap; policies, hooks and the metric sink are shared. A breaker
/// takes its own copy at construction and never observes later changes.
#[derive(Clone)]
pub struct Settings {
    pub(crate) max_requests: u32,
    pub(crate) interval: Duration,
    pub(crate) timeout: Duration,
    pub(crate) ready_to_trip: Arc<dyn TripPolicy>,
    pub(crate) is_successful: Arc<dyn SuccessPolicy>,
    pub(crate) hooks: Arc<HookRegistry>,
    pub(crate) metric_sink: Arc<dyn MetricSink>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_requests: 1,
            interval: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            ready_to_trip: Arc::new(ConsecutiveFailures::default()),
            is_successful: Arc::new(AllErrorsFail),
            hooks: Arc::new(HookRegistry::new()),
            metric_sink: Arc::new(NullMetricSink),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Creates a new builder with default settings.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Maximum trial calls admitted while half-open.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Period after which closed-state counts are cleared; zero disables clearing.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long an open breaker waits before admitting a trial call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replaces zero values with their effective defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_requests == 0 {
            self.max_requests = 1;
        }
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        self
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of trial calls admitted while half-open. Zero means one.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.settings.max_requests = max_requests;
        self
    }

    /// Sets the period after which closed-state counts are cleared.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.interval = interval;
        self
    }

    /// Sets how long the breaker stays open before probing. Zero means 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets the policy deciding when a closed breaker trips.
    pub fn ready_to_trip<P: TripPolicy>(mut self, policy: P) -> Self {
        self.settings.ready_to_trip = Arc::new(policy);
        self
    }

    /// Sets the policy classifying operation errors.
    pub fn is_successful<P: SuccessPolicy>(mut self, policy: P) -> Self {
        self.settings.is_successful = Arc::new(policy);
        self
    }

    /// Sets a metric sink for the circuit breaker.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.settings.metric_sink = Arc::new(sink);
        self
    }

    /// Sets a shared metric sink, e.g. one used by every breaker of a manager.
    pub fn shared_metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.settings.metric_sink = sink;
        self
    }

    /// Sets a hook registry for the circuit breaker.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.settings.hooks = Arc::new(hooks);
        self
    }

    /// Sets a shared hook registry.
    pub fn shared_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.settings.hooks = hooks;
        self
    }

    /// Builds the settings.
    pub fn build(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_normalized() {
        let settings = Settings::builder()
            .max_requests(0)
            .timeout(Duration::ZERO)
            .build()
            .normalized();

        assert_eq!(settings.max_requests(), 1);
        assert_eq!(settings.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(settings.interval(), Duration::ZERO);
    }

    #[test]
    fn explicit_values_survive_normalization() {
        let settings = Settings::builder()
            .max_requests(3)
            .interval(Duration::from_secs(10))
            .timeout(Duration::from_secs(5))
            .build()
            .normalized();

        assert_eq!(settings.max_requests(), 3);
        assert_eq!(settings.interval(), Duration::from_secs(10));
        assert_eq!(settings.timeout(), Duration::from_secs(5));
    }
}
