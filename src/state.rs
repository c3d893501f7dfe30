//! Circuit breaker states.

use std::fmt::{self, Display, Formatter};

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Circuit is closed and operations are allowed.
    #[default]
    Closed = 0,

    /// Circuit is open and operations are rejected.
    Open = 1,

    /// Circuit is allowing a limited number of operations to test recovery.
    HalfOpen = 2,
}

impl State {
    /// Stable lowercase name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
