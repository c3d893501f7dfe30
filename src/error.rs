//! Error types for the circuit breaker library.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result type for circuit breaker operations.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Error type for calls made through a circuit breaker.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The circuit is open, calls are not permitted.
    Open,

    /// The circuit is half-open and its trial quota is exhausted.
    TooManyRequests,

    /// The underlying operation failed.
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Returns true if the breaker rejected the call without running it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BreakerError::Open | BreakerError::TooManyRequests)
    }

    /// Returns the operation error, if the call was admitted and failed.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Reason a breaker refused to admit a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The breaker is open and its timeout has not elapsed.
    Open,

    /// The breaker is half-open and already admitted `max_requests` trial calls.
    TooManyRequests,
}

impl Rejection {
    /// Stable lowercase name, used for metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::Open => "open",
            Rejection::TooManyRequests => "too_many_requests",
        }
    }
}

impl<E> From<Rejection> for BreakerError<E> {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Open => BreakerError::Open,
            Rejection::TooManyRequests => BreakerError::TooManyRequests,
        }
    }
}

impl<E> Display for BreakerError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => write!(f, "Circuit breaker is open"),
            BreakerError::TooManyRequests => write!(f, "Circuit breaker has too many requests"),
            BreakerError::Operation(e) => write!(f, "Operation error: {}", e),
        }
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Open => write!(f, "Circuit breaker is open"),
            Rejection::TooManyRequests => write!(f, "Circuit breaker has too many requests"),
        }
    }
}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BreakerError::Open | BreakerError::TooManyRequests => None,
            BreakerError::Operation(e) => Some(e),
        }
    }
}

impl Error for Rejection {}
