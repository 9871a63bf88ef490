//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_guard::{BreakerConfig, BreakerRegistry, Executor, ManualClock};

/// Error returned by the mock upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream returned {0}")]
pub struct UpstreamError(pub u16);

/// Mock dependency that counts how often it is actually invoked.
#[derive(Debug, Default)]
pub struct Upstream {
    calls: AtomicUsize,
}

impl Upstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn ok(&self) -> Result<&'static str, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("generated text")
    }

    pub async fn fail(&self) -> Result<&'static str, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError(503))
    }

    pub async fn hang(&self, for_: Duration) -> Result<&'static str, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(for_).await;
        Ok("too late")
    }
}

/// Three failures to open, 30s recovery, two trial successes to close.
pub fn scenario_config() -> BreakerConfig {
    BreakerConfig {
        failure_threshold: 3,
        recovery_timeout: Duration::from_secs(30),
        success_threshold: 2,
        call_timeout: Duration::from_secs(20),
        max_concurrent_trial_calls: 1,
    }
}

/// Executor over a fresh registry that auto-creates breakers with `config`,
/// driven by a manual clock.
pub fn executor_with(config: BreakerConfig) -> (Executor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let registry = BreakerRegistry::with_clock(clock.clone())
        .with_default_config(config)
        .expect("valid test config");
    (Executor::new(Arc::new(registry)), clock)
}
