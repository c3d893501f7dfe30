use breakerhub::{Breaker, Counts, FailureRatio, ManualClock, Rejection, Settings, State, TripPolicy};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn breaker_with(settings: Settings) -> (Breaker, ManualClock) {
    let clock = ManualClock::new();
    let breaker = Breaker::with_clock("prop", settings, Arc::new(clock.clone()));
    (breaker, clock)
}

proptest! {
    // Replaying the same outcomes against a plain tally tells us where the
    // breaker must trip: at the first failure whose counts satisfy the policy.
    #[test]
    fn trips_exactly_when_policy_first_holds(
        outcomes in prop::collection::vec(any::<bool>(), 1..64),
        min_requests in 1u32..8,
        ratio in 0.1f64..1.0,
    ) {
        let policy = FailureRatio::new(min_requests, ratio);
        let settings = Settings::builder()
            .timeout(Duration::from_secs(10))
            .ready_to_trip(policy)
            .build();
        let (breaker, _clock) = breaker_with(settings);

        let mut expected = Counts::new();
        let mut tripped_at = None;
        for (i, success) in outcomes.iter().enumerate() {
            if *success {
                expected.on_success();
            } else {
                expected.on_failure();
                if policy.ready_to_trip(&expected) {
                    tripped_at = Some(i);
                    break;
                }
            }
        }

        for (i, success) in outcomes.iter().enumerate() {
            let generation = breaker.before_call();
            match tripped_at {
                Some(trip) if i > trip => {
                    prop_assert_eq!(generation, Err(Rejection::Open));
                    continue;
                }
                _ => {}
            }
            let generation = generation.unwrap();
            if *success {
                breaker.record_success(generation);
            } else {
                breaker.record_failure(generation);
            }

            match tripped_at {
                Some(trip) if i >= trip => prop_assert_eq!(breaker.state(), State::Open),
                _ => {
                    prop_assert_eq!(breaker.state(), State::Closed);
                    prop_assert_eq!(breaker.counts(), expected_prefix(&outcomes[..=i]));
                }
            }
        }
    }

    #[test]
    fn counts_requests_match_outcomes(outcomes in prop::collection::vec(any::<bool>(), 0..128)) {
        let mut counts = Counts::new();
        for success in &outcomes {
            if *success {
                counts.on_success();
            } else {
                counts.on_failure();
            }
            prop_assert_eq!(counts.requests(), counts.total_successes() + counts.total_failures());
            prop_assert!(counts.consecutive_successes() == 0 || counts.consecutive_failures() == 0);
        }
        prop_assert_eq!(counts.requests() as usize, outcomes.len());
    }

    #[test]
    fn open_rejects_until_timeout(timeout_ms in 1u64..10_000, probe_ms in 0u64..20_000) {
        let settings = Settings::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .ready_to_trip(|counts: &Counts| counts.total_failures() >= 1)
            .build();
        let (breaker, clock) = breaker_with(settings);

        let generation = breaker.before_call().unwrap();
        breaker.record_failure(generation);

        clock.advance(Duration::from_millis(probe_ms));
        let admission = breaker.before_call();
        if probe_ms < timeout_ms {
            prop_assert_eq!(admission, Err(Rejection::Open));
            prop_assert_eq!(breaker.state(), State::Open);
        } else {
            prop_assert!(admission.is_ok());
            prop_assert_eq!(breaker.state(), State::HalfOpen);
        }
    }
}

fn expected_prefix(outcomes: &[bool]) -> Counts {
    let mut counts = Counts::new();
    for success in outcomes {
        if *success {
            counts.on_success();
        } else {
            counts.on_failure();
        }
    }
    counts
}
