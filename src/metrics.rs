//! Metric sinks for circuit breaker events.

use crate::error::Rejection;
use crate::state::State;
use std::time::Duration;

/// Trait for metrics sinks that can receive circuit breaker events.
///
/// Sinks are called outside the breaker's lock and may be shared between
/// breakers; every event carries the breaker name.
pub trait MetricSink: Send + Sync + 'static {
    /// Records a state transition event.
    fn record_state_transition(&self, name: &str, from: State, to: State);

    /// Records a call the breaker refused to admit.
    fn record_rejection(&self, name: &str, rejection: Rejection);

    /// Records the outcome of an admitted call.
    ///
    /// `duration` is wall-clock latency measured with [`std::time::Instant`],
    /// not with the breaker's [`Clock`](crate::Clock), so it is real even when
    /// the breaker runs on a [`ManualClock`](crate::ManualClock).
    fn record_call(&self, name: &str, success: bool, duration: Duration);
}

/// A null metrics sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_state_transition(&self, _name: &str, _from: State, _to: State) {}
    fn record_rejection(&self, _name: &str, _rejection: Rejection) {}
    fn record_call(&self, _name: &str, _success: bool, _duration: Duration) {}
}

#[cfg(feature = "prometheus")]
pub use self::prometheus::PrometheusSink;

#[cfg(feature = "prometheus")]
mod prometheus {
    use super::MetricSink;
    use crate::error::Rejection;
    use crate::state::State;
    use prometheus_client::encoding::EncodeLabelSet;
    use prometheus_client::metrics::counter::Counter;
    use prometheus_client::metrics::family::Family;
    use prometheus_client::metrics::gauge::Gauge;
    use prometheus_client::registry::Registry;
    use std::time::Duration;

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct BreakerLabels {
        breaker: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct TransitionLabels {
        breaker: String,
        from: String,
        to: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct RejectionLabels {
        breaker: String,
        reason: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct CallLabels {
        breaker: String,
        outcome: String,
    }

    /// Sink exporting breaker events through a Prometheus registry.
    ///
    /// The `breaker_state` gauge reports 0 for closed, 1 for open and 2 for
    /// half-open.
    #[derive(Debug, Clone, Default)]
    pub struct PrometheusSink {
        transitions: Family<TransitionLabels, Counter>,
        rejections: Family<RejectionLabels, Counter>,
        calls: Family<CallLabels, Counter>,
        state: Family<BreakerLabels, Gauge>,
    }

    impl PrometheusSink {
        /// Creates a sink and registers its metrics with `registry`.
        pub fn new(registry: &mut Registry) -> Self {
            let sink = Self::default();
            registry.register(
                "breaker_transitions",
                "Circuit breaker state transitions",
                sink.transitions.clone(),
            );
            registry.register(
                "breaker_rejections",
                "Calls rejected by a circuit breaker",
                sink.rejections.clone(),
            );
            registry.register(
                "breaker_calls",
                "Calls admitted by a circuit breaker, by outcome",
                sink.calls.clone(),
            );
            registry.register(
                "breaker_state",
                "Current circuit breaker state",
                sink.state.clone(),
            );
            sink
        }
    }

    impl MetricSink for PrometheusSink {
        fn record_state_transition(&self, name: &str, from: State, to: State) {
            self.transitions
                .get_or_create(&TransitionLabels {
                    breaker: name.to_owned(),
                    from: from.as_str().to_owned(),
                    to: to.as_str().to_owned(),
                })
                .inc();
            self.state
                .get_or_create(&BreakerLabels {
                    breaker: name.to_owned(),
                })
                .set(to as i64);
        }

        fn record_rejection(&self, name: &str, rejection: Rejection) {
            self.rejections
                .get_or_create(&RejectionLabels {
                    breaker: name.to_owned(),
                    reason: rejection.as_str().to_owned(),
                })
                .inc();
        }

        fn record_call(&self, name: &str, success: bool, _duration: Duration) {
            let outcome = if success { "success" } else { "failure" };
            self.calls
                .get_or_create(&CallLabels {
                    breaker: name.to_owned(),
                    outcome: outcome.to_owned(),
                })
                .inc();
        }
    }
}
