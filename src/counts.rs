//! Per-generation call outcome tally.

/// Outcome counters for the current generation of a breaker.
///
/// `requests` always equals `total_successes + total_failures`. At most one of
/// the two consecutive counters is non-zero. Counters saturate at `u32::MAX`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    requests: u32,
    total_successes: u32,
    total_failures: u32,
    consecutive_successes: u32,
    consecutive_failures: u32,
}

impl Counts {
    /// Creates an all-zero tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed calls.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Number of successful calls.
    pub fn total_successes(&self) -> u32 {
        self.total_successes
    }

    /// Number of failed calls.
    pub fn total_failures(&self) -> u32 {
        self.total_failures
    }

    /// Successes since the last failure.
    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Fraction of calls that failed, or 0.0 when nothing completed yet.
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }

        f64::from(self.total_failures) / f64::from(self.requests)
    }

    /// Records a successful call.
    pub fn on_success(&mut self) {
        self.requests = self.requests.saturating_add(1);
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    /// Records a failed call.
    pub fn on_failure(&mut self) {
        self.requests = self.requests.saturating_add(1);
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    /// Zeroes every counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_resets_consecutive_failures() {
        let mut counts = Counts::new();
        counts.on_failure();
        counts.on_failure();
        counts.on_success();

        assert_eq!(counts.requests(), 3);
        assert_eq!(counts.total_failures(), 2);
        assert_eq!(counts.total_successes(), 1);
        assert_eq!(counts.consecutive_failures(), 0);
        assert_eq!(counts.consecutive_successes(), 1);
    }

    #[test]
    fn failure_resets_consecutive_successes() {
        let mut counts = Counts::new();
        counts.on_success();
        counts.on_success();
        counts.on_failure();

        assert_eq!(counts.consecutive_successes(), 0);
        assert_eq!(counts.consecutive_failures(), 1);
    }

    #[test]
    fn failure_ratio_of_empty_tally_is_zero() {
        let counts = Counts::new();
        assert_eq!(counts.failure_ratio(), 0.0);
    }

    #[test]
    fn failure_ratio() {
        let mut counts = Counts::new();
        counts.on_success();
        counts.on_failure();
        counts.on_failure();
        counts.on_failure();
        assert!((counts.failure_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut counts = Counts::new();
        counts.on_success();
        counts.on_failure();
        counts.clear();
        assert_eq!(counts, Counts::default());
    }

    #[test]
    fn counters_saturate() {
        let mut counts = Counts {
            requests: u32::MAX,
            total_successes: u32::MAX,
            total_failures: 0,
            consecutive_successes: u32::MAX,
            consecutive_failures: 0,
        };
        counts.on_success();
        assert_eq!(counts.requests(), u32::MAX);
        assert_eq!(counts.consecutive_successes(), u32::MAX);
    }
}
