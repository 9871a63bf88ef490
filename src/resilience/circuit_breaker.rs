//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: trial calls test whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: first admission check after recovery_timeout
//! Half-Open → Closed: consecutive_successes >= success_threshold
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - Admission, trial slot reservation and outcome recording share one mutex
//! - Every transition bumps a generation; permits from an older generation
//!   report into the void, so late outcomes never reopen or double-count
//! - The lock is never held while the protected call runs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::resilience::clock::Clock;
use crate::resilience::error::BreakerError;
use crate::resilience::types::{BreakerConfig, BreakerSnapshot, CircuitState};

/// Outcome of an admitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Failure,
}

/// Why admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rejected {
    pub state: CircuitState,
    pub retry_after: Option<Duration>,
}

/// Mutable part of a breaker. Only touched with the mutex held.
#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    in_flight_trials: u32,
    generation: u64,
}

/// A state change, announced after the lock is released.
#[derive(Debug, Clone, Copy)]
struct Transition {
    from: CircuitState,
    to: CircuitState,
}

/// Circuit breaker guarding one named dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a CLOSED breaker with zero counters.
    pub fn new(
        name: impl Into<String>,
        config: BreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BreakerError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BreakerError::Configuration {
                breaker: name,
                reason: "name must not be empty".to_string(),
            });
        }
        config.validate(&name)?;

        metrics::record_state(&name, CircuitState::Closed);

        Ok(Self {
            name,
            config,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                in_flight_trials: 0,
                generation: 0,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state as stored. An expired OPEN circuit stays OPEN until
    /// the next admission check.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consistent copy of all fields.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let taken_at = self.clock.now();
        let inner = self.lock();
        let next_attempt_allowed_at = match inner.state {
            CircuitState::Open => inner.opened_at.and_then(|at| self.recovery_deadline(at)),
            _ => None,
        };

        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            in_flight_trial_calls: inner.in_flight_trials,
            opened_at: inner.opened_at,
            next_attempt_allowed_at,
            taken_at,
            config: self.config.clone(),
        }
    }

    /// Ask for admission. On success the returned permit must be used to
    /// report the call's outcome.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, Rejected> {
        let now = self.clock.now();
        let mut transition = None;

        let admitted = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => Ok((inner.generation, false)),
                CircuitState::Open => {
                    let deadline = match inner.opened_at {
                        Some(at) => self.recovery_deadline(at),
                        None => Some(now),
                    };
                    let wait = match deadline {
                        Some(deadline) if now >= deadline => None,
                        Some(deadline) => Some(Some(deadline - now)),
                        // Recovery lies beyond the clock's range: never admit a trial.
                        None => Some(None),
                    };
                    if let Some(retry_after) = wait {
                        Err(Rejected {
                            state: CircuitState::Open,
                            retry_after,
                        })
                    } else {
                        transition = Some(self.enter(&mut inner, CircuitState::HalfOpen, now));
                        inner.in_flight_trials = 1;
                        Ok((inner.generation, true))
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.in_flight_trials < self.config.max_concurrent_trial_calls {
                        inner.in_flight_trials += 1;
                        Ok((inner.generation, true))
                    } else {
                        Err(Rejected {
                            state: CircuitState::HalfOpen,
                            retry_after: None,
                        })
                    }
                }
            }
        };

        if let Some(t) = transition {
            self.announce(t);
        }

        match admitted {
            Ok((generation, trial)) => Ok(CallPermit {
                breaker: Arc::clone(self),
                generation,
                trial,
                settled: false,
            }),
            Err(rejected) => {
                tracing::debug!(
                    breaker = %self.name,
                    state = %rejected.state,
                    retry_after = ?rejected.retry_after,
                    "Call rejected"
                );
                Err(rejected)
            }
        }
    }

    /// Force CLOSED with zero counters.
    pub fn reset(&self) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.lock();
            self.enter(&mut inner, CircuitState::Closed, now)
        };
        tracing::info!(breaker = %self.name, from = %transition.from, "Circuit breaker manually reset");
        self.announce(transition);
    }

    /// Force OPEN now, regardless of the failure threshold.
    pub fn force_open(&self) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.lock();
            self.enter(&mut inner, CircuitState::Open, now)
        };
        tracing::info!(breaker = %self.name, from = %transition.from, "Circuit breaker manually opened");
        self.announce(transition);
    }

    fn complete(&self, generation: u64, trial: bool, outcome: Outcome) {
        let now = self.clock.now();
        let mut transition = None;

        {
            let mut inner = self.lock();
            if inner.generation != generation {
                drop(inner);
                tracing::trace!(breaker = %self.name, ?outcome, "Ignoring stale outcome");
                return;
            }

            match (inner.state, outcome) {
                (CircuitState::Closed, Outcome::Success) => {
                    inner.consecutive_failures = 0;
                }
                (CircuitState::Closed, Outcome::Failure) => {
                    inner.consecutive_failures += 1;
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        transition = Some(self.enter(&mut inner, CircuitState::Open, now));
                    }
                }
                (CircuitState::HalfOpen, outcome) if trial => {
                    inner.in_flight_trials = inner.in_flight_trials.saturating_sub(1);
                    match outcome {
                        Outcome::Success => {
                            inner.consecutive_successes += 1;
                            if inner.consecutive_successes >= self.config.success_threshold {
                                transition =
                                    Some(self.enter(&mut inner, CircuitState::Closed, now));
                            }
                        }
                        Outcome::Failure => {
                            transition = Some(self.enter(&mut inner, CircuitState::Open, now));
                        }
                    }
                }
                // Permits are fenced by generation, so nothing else can match.
                _ => {}
            }
        }

        if let Some(t) = transition {
            self.announce(t);
        }
    }

    /// A permit was dropped without a report: free its trial slot.
    fn abandon(&self, generation: u64, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.in_flight_trials = inner.in_flight_trials.saturating_sub(1);
        }
    }

    /// When an OPEN circuit opened at `opened_at` may admit a trial call.
    /// `None` when that instant is not representable.
    fn recovery_deadline(&self, opened_at: Instant) -> Option<Instant> {
        opened_at.checked_add(self.config.recovery_timeout)
    }

    /// Move to `to`, resetting everything the target state requires.
    fn enter(&self, inner: &mut Inner, to: CircuitState, now: Instant) -> Transition {
        let from = inner.state;

        inner.state = to;
        inner.generation = inner.generation.wrapping_add(1);
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.in_flight_trials = 0;
        match to {
            CircuitState::Open => inner.opened_at = Some(now),
            CircuitState::Closed => inner.opened_at = None,
            CircuitState::HalfOpen => {}
        }

        Transition { from, to }
    }

    fn announce(&self, t: Transition) {
        match t.to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = %t.from,
                recovery_timeout = ?self.config.recovery_timeout,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                breaker = %self.name,
                "Circuit breaker half-open, admitting trial calls"
            ),
            CircuitState::Closed => tracing::info!(
                breaker = %self.name,
                from = %t.from,
                "Circuit breaker closed"
            ),
        }
        metrics::record_transition(&self.name, t.from, t.to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State updates never panic half-way, so a poisoned guard is consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission ticket for one call.
///
/// Reporting consumes the permit. Dropping it unreported releases a trial
/// slot without touching counters.
#[derive(Debug)]
pub(crate) struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl CallPermit {
    /// Whether this call was admitted as a HALF_OPEN trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn succeed(self) {
        self.settle(Outcome::Success);
    }

    pub fn fail(self) {
        self.settle(Outcome::Failure);
    }

    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.complete(self.generation, self.trial, outcome);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abandon(self.generation, self.trial);
        }
    }
}
