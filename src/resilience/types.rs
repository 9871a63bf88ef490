//! Circuit breaker types and configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::resilience::error::BreakerError;

/// Operating mode of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are tallied.
    Closed,
    /// Calls are rejected without reaching the dependency.
    Open,
    /// A bounded number of trial calls probe for recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }

    /// Numeric encoding used by the state gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-breaker configuration, captured when the breaker is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures in CLOSED that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays OPEN before a trial call is admitted.
    pub recovery_timeout: Duration,
    /// Consecutive trial successes in HALF_OPEN that close the circuit.
    pub success_threshold: u32,
    /// Deadline for a single call; exceeding it counts as a failure.
    pub call_timeout: Duration,
    /// Bulkhead size while HALF_OPEN.
    pub max_concurrent_trial_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            call_timeout: Duration::from_secs(20),
            max_concurrent_trial_calls: 1,
        }
    }
}

impl BreakerConfig {
    /// Reject non-positive thresholds and durations.
    pub fn validate(&self, breaker: &str) -> Result<(), BreakerError> {
        let reason = if self.failure_threshold == 0 {
            "failure_threshold must be positive"
        } else if self.recovery_timeout.is_zero() {
            "recovery_timeout must be positive"
        } else if self.success_threshold == 0 {
            "success_threshold must be positive"
        } else if self.call_timeout.is_zero() {
            "call_timeout must be positive"
        } else if self.max_concurrent_trial_calls == 0 {
            "max_concurrent_trial_calls must be positive"
        } else {
            return Ok(());
        };

        Err(BreakerError::Configuration {
            breaker: breaker.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Per-call settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides the breaker's `call_timeout` for this call only.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Point-in-time copy of a breaker's state, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub in_flight_trial_calls: u32,
    /// Most recent transition into OPEN. Cleared when the circuit closes.
    pub opened_at: Option<Instant>,
    /// When an OPEN circuit will admit its next trial call.
    pub next_attempt_allowed_at: Option<Instant>,
    /// Clock reading at the time the snapshot was taken.
    pub taken_at: Instant,
    pub config: BreakerConfig,
}

impl BreakerSnapshot {
    /// Time left until a trial call is admitted (zero once the deadline passed).
    pub fn retry_after(&self) -> Option<Duration> {
        self.next_attempt_allowed_at
            .map(|at| at.saturating_duration_since(self.taken_at))
    }

    /// How long ago the circuit last opened.
    pub fn open_for(&self) -> Option<Duration> {
        self.opened_at
            .map(|at| self.taken_at.saturating_duration_since(at))
    }

    pub fn is_healthy(&self) -> bool {
        self.state == CircuitState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BreakerConfig::default().validate("inference").is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let cases = [
            BreakerConfig { failure_threshold: 0, ..Default::default() },
            BreakerConfig { recovery_timeout: Duration::ZERO, ..Default::default() },
            BreakerConfig { success_threshold: 0, ..Default::default() },
            BreakerConfig { call_timeout: Duration::ZERO, ..Default::default() },
            BreakerConfig { max_concurrent_trial_calls: 0, ..Default::default() },
        ];

        for config in cases {
            let err = config.validate("inference").unwrap_err();
            assert!(matches!(err, BreakerError::Configuration { ref breaker, .. } if breaker == "inference"));
        }
    }

    #[test]
    fn test_state_serializes_upper_snake() {
        assert_eq!(serde_json::to_string(&CircuitState::HalfOpen).unwrap(), "\"HALF_OPEN\"");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }

    #[test]
    fn test_snapshot_retry_after_saturates() {
        let now = Instant::now();
        let snapshot = BreakerSnapshot {
            name: "a".into(),
            state: CircuitState::Open,
            consecutive_failures: 0,
            consecutive_successes: 0,
            in_flight_trial_calls: 0,
            opened_at: Some(now),
            next_attempt_allowed_at: Some(now + Duration::from_secs(5)),
            taken_at: now + Duration::from_secs(9),
            config: BreakerConfig::default(),
        };

        assert_eq!(snapshot.retry_after(), Some(Duration::ZERO));
        assert_eq!(snapshot.open_for(), Some(Duration::from_secs(9)));
        assert!(!snapshot.is_healthy());
    }
}
