//! Call execution through a named breaker.
//!
//! # Responsibilities
//! - Resolve the breaker via the registry
//! - Gate the call (reject without invoking while open)
//! - Run the operation under the call deadline
//! - Report exactly one outcome back to the breaker
//!
//! # Design Decisions
//! - The trial slot is reserved at admission, not at completion
//! - A timeout is a terminal failure; a late result is discarded
//! - Rejections never count against the breaker

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::observability::metrics::{self, CallOutcome};
use crate::resilience::circuit_breaker::{CallPermit, CircuitBreaker};
use crate::resilience::error::{BreakerError, CallError};
use crate::resilience::registry::BreakerRegistry;
use crate::resilience::timeouts::{self, BlockingOutcome};
use crate::resilience::types::CallOptions;

/// Wraps calls to protected dependencies.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<BreakerRegistry>,
}

impl Executor {
    pub fn new(registry: Arc<BreakerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<BreakerRegistry> {
        &self.registry
    }

    /// Call `operation` through breaker `name` with the breaker's own timeout.
    pub async fn execute<T, E, F, Fut>(&self, name: &str, operation: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(name, CallOptions::default(), operation).await
    }

    /// Call `operation` through breaker `name`.
    pub async fn execute_with<T, E, F, Fut>(
        &self,
        name: &str,
        options: CallOptions,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (breaker, permit, limit) = self.admit(name, options)?;
        let started = Instant::now();

        match timeouts::with_deadline(limit, operation()).await {
            Ok(Ok(value)) => {
                permit.succeed();
                metrics::record_call(breaker.name(), CallOutcome::Success, started);
                Ok(value)
            }
            Ok(Err(source)) => {
                permit.fail();
                metrics::record_call(breaker.name(), CallOutcome::Failure, started);
                tracing::debug!(breaker = %breaker.name(), "Protected call failed");
                Err(CallError::Upstream {
                    breaker: breaker.name().to_string(),
                    source,
                })
            }
            Err(elapsed) => {
                permit.fail();
                Err(self.timed_out(&breaker, elapsed.0, started))
            }
        }
    }

    /// Call a synchronous `operation` on the blocking pool through breaker `name`.
    ///
    /// If the deadline fires the closure keeps running in the background;
    /// its result never reaches the breaker.
    pub async fn execute_blocking<T, E, F>(
        &self,
        name: &str,
        options: CallOptions,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (breaker, permit, limit) = self.admit(name, options)?;
        let started = Instant::now();

        match timeouts::blocking_with_deadline(limit, operation).await {
            Ok(BlockingOutcome::Returned(Ok(value))) => {
                permit.succeed();
                metrics::record_call(breaker.name(), CallOutcome::Success, started);
                Ok(value)
            }
            Ok(BlockingOutcome::Returned(Err(source))) => {
                permit.fail();
                metrics::record_call(breaker.name(), CallOutcome::Failure, started);
                Err(CallError::Upstream {
                    breaker: breaker.name().to_string(),
                    source,
                })
            }
            Ok(BlockingOutcome::Panicked) => {
                permit.fail();
                metrics::record_call(breaker.name(), CallOutcome::Failure, started);
                Err(CallError::Panicked {
                    breaker: breaker.name().to_string(),
                })
            }
            Err(elapsed) => {
                permit.fail();
                Err(self.timed_out(&breaker, elapsed.0, started))
            }
        }
    }

    fn admit<E>(
        &self,
        name: &str,
        options: CallOptions,
    ) -> Result<(Arc<CircuitBreaker>, CallPermit, Duration), CallError<E>> {
        if options.timeout.is_some_and(|t| t.is_zero()) {
            return Err(BreakerError::Configuration {
                breaker: name.to_string(),
                reason: "timeout override must be positive".to_string(),
            }
            .into());
        }

        let breaker = self.registry.resolve(name)?;
        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(rejected) => {
                metrics::record_rejection(breaker.name());
                return Err(CallError::Open {
                    breaker: breaker.name().to_string(),
                    retry_after: rejected.retry_after,
                });
            }
        };

        if permit.is_trial() {
            tracing::debug!(breaker = %breaker.name(), "Admitted trial call");
        }

        let limit = options.timeout.unwrap_or(breaker.config().call_timeout);
        Ok((breaker, permit, limit))
    }

    fn timed_out<E>(&self, breaker: &CircuitBreaker, limit: Duration, started: Instant) -> CallError<E> {
        metrics::record_call(breaker.name(), CallOutcome::Timeout, started);
        tracing::warn!(breaker = %breaker.name(), timeout = ?limit, "Protected call timed out");
        CallError::Timeout {
            breaker: breaker.name().to_string(),
            timeout: limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;
    use crate::resilience::types::{BreakerConfig, CircuitState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor(config: BreakerConfig) -> (Executor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let registry = BreakerRegistry::with_clock(clock.clone())
            .with_default_config(config)
            .unwrap();
        (Executor::new(Arc::new(registry)), clock)
    }

    #[tokio::test]
    async fn test_call_success() {
        let (executor, _) = executor(BreakerConfig::default());

        let result: Result<i32, CallError<String>> =
            executor.execute("inference", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_upstream_error_is_wrapped() {
        let (executor, _) = executor(BreakerConfig::default());

        let result: Result<i32, CallError<String>> = executor
            .execute("inference", || async { Err("backend 503".to_string()) })
            .await;

        match result {
            Err(CallError::Upstream { breaker, source }) => {
                assert_eq!(breaker, "inference");
                assert_eq!(source, "backend 503");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let snap = executor.registry().snapshot("inference").unwrap();
        assert_eq!(snap.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_unknown_breaker_without_default() {
        let executor = Executor::new(Arc::new(BreakerRegistry::new()));
        let calls = AtomicUsize::new(0);

        let result: Result<(), CallError<String>> = executor
            .execute("inference", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(CallError::Breaker(BreakerError::UnknownBreaker(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_timeout_override_rejected() {
        let (executor, _) = executor(BreakerConfig::default());

        let result: Result<(), CallError<String>> = executor
            .execute_with("inference", CallOptions::with_timeout(Duration::ZERO), || async {
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(CallError::Breaker(BreakerError::Configuration { .. }))
        ));
        assert!(!executor.registry().contains("inference"));
    }

    #[tokio::test]
    async fn test_timeout_override_applies() {
        let (executor, _) = executor(BreakerConfig::default());

        let result: Result<(), CallError<String>> = executor
            .execute_with(
                "inference",
                CallOptions::with_timeout(Duration::from_millis(20)),
                || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                },
            )
            .await;

        match result {
            Err(CallError::Timeout { timeout, .. }) => {
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejection_does_not_count() {
        let (executor, _) = executor(BreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });

        let _: Result<(), CallError<String>> = executor
            .execute("inference", || async { Err("down".to_string()) })
            .await;
        let before = executor.registry().snapshot("inference").unwrap();
        assert_eq!(before.state, CircuitState::Open);

        let result: Result<(), CallError<String>> =
            executor.execute("inference", || async { Ok(()) }).await;
        match result {
            Err(CallError::Open { retry_after, .. }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let after = executor.registry().snapshot("inference").unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_blocking_call() {
        let (executor, _) = executor(BreakerConfig::default());

        let ok: Result<u64, CallError<String>> = executor
            .execute_blocking("inference", CallOptions::default(), || Ok(5))
            .await;
        assert_eq!(ok.unwrap(), 5);

        let panicked: Result<u64, CallError<String>> = executor
            .execute_blocking("inference", CallOptions::default(), || panic!("model crashed"))
            .await;
        assert!(matches!(panicked, Err(CallError::Panicked { .. })));
        assert_eq!(
            executor.registry().snapshot("inference").unwrap().consecutive_failures,
            1
        );
    }

    #[tokio::test]
    async fn test_blocking_timeout_is_reported_once() {
        let (executor, _) = executor(BreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        });

        let result: Result<(), CallError<String>> = executor
            .execute_blocking(
                "inference",
                CallOptions::with_timeout(Duration::from_millis(20)),
                || {
                    std::thread::sleep(Duration::from_millis(100));
                    Ok(())
                },
            )
            .await;
        assert!(matches!(result, Err(CallError::Timeout { .. })));

        // Let the detached closure finish; its success must not be recorded.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let snap = executor.registry().snapshot("inference").unwrap();
        assert_eq!(snap.consecutive_failures, 1);
        assert_eq!(snap.state, CircuitState::Closed);
    }
}
