//! Error taxonomy for breaker management and protected calls.

use std::time::Duration;
use thiserror::Error;

/// Registry and configuration errors. These never touch breaker state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// A threshold or duration was non-positive.
    #[error("invalid configuration for circuit breaker '{breaker}': {reason}")]
    Configuration { breaker: String, reason: String },

    /// No breaker with that name, and auto-creation is unavailable.
    #[error("unknown circuit breaker '{0}'")]
    UnknownBreaker(String),

    /// Explicit registration of a name that already exists.
    #[error("circuit breaker '{0}' is already registered")]
    DuplicateBreaker(String),
}

/// Failure of a call made through a breaker.
///
/// Only `Timeout`, `Upstream` and `Panicked` are failure outcomes that move
/// the breaker's counters. `Open` is a rejection: the operation never ran.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// Fail-fast rejection: circuit OPEN or HALF_OPEN bulkhead exhausted.
    #[error("circuit breaker '{breaker}' is open")]
    Open {
        breaker: String,
        /// Time until the next trial call may be admitted, when known.
        retry_after: Option<Duration>,
    },

    /// The operation did not finish within its deadline.
    #[error("call through '{breaker}' timed out after {timeout:?}")]
    Timeout { breaker: String, timeout: Duration },

    /// The operation itself returned an error.
    #[error("call through '{breaker}' failed: {source}")]
    Upstream {
        breaker: String,
        #[source]
        source: E,
    },

    /// A blocking operation panicked.
    #[error("call through '{breaker}' panicked")]
    Panicked { breaker: String },

    #[error(transparent)]
    Breaker(#[from] BreakerError),
}

impl<E> CallError<E> {
    /// True for fail-fast rejections that never reached the dependency.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CallError::Open { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }

    /// True when the error was recorded as a failure against the breaker.
    pub fn counts_as_failure(&self) -> bool {
        matches!(
            self,
            CallError::Timeout { .. } | CallError::Upstream { .. } | CallError::Panicked { .. }
        )
    }

    /// The wrapped operation's own error, if that is what happened.
    pub fn into_upstream(self) -> Option<E> {
        match self {
            CallError::Upstream { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for calls made through a breaker.
pub type CallResult<T, E> = Result<T, CallError<E>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = BreakerError::UnknownBreaker("inference".into());
        assert_eq!(err.to_string(), "unknown circuit breaker 'inference'");

        let err: CallError<io::Error> = CallError::Timeout {
            breaker: "inference".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "call through 'inference' timed out after 250ms");
    }

    #[test]
    fn test_upstream_keeps_source() {
        let err: CallError<io::Error> = CallError::Upstream {
            breaker: "inference".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.counts_as_failure());
        assert!(!err.is_rejection());

        let inner = err.into_upstream().unwrap();
        assert_eq!(inner.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn test_rejection_is_not_a_failure() {
        let err: CallError<io::Error> = CallError::Open {
            breaker: "inference".into(),
            retry_after: None,
        };
        assert!(err.is_rejection());
        assert!(!err.counts_as_failure());
    }
}
