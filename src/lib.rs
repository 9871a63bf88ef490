//! Circuit breakers for slow or unreliable upstream dependencies.
//!
//! ```no_run
//! use std::sync::Arc;
//! use circuit_guard::{BreakerConfig, BreakerRegistry, CallError, Executor};
//!
//! # async fn infer(_: &str) -> Result<String, std::io::Error> { Ok(String::new()) }
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = BreakerRegistry::new().with_default_config(BreakerConfig::default())?;
//! let executor = Executor::new(Arc::new(registry));
//!
//! match executor.execute("inference", || infer("prompt")).await {
//!     Ok(text) => println!("{text}"),
//!     Err(CallError::Open { retry_after, .. }) => println!("degraded, retry in {retry_after:?}"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GuardConfig;
pub use lifecycle::Shutdown;
pub use resilience::{
    BreakerConfig, BreakerError, BreakerRegistry, BreakerSnapshot, CallError, CallOptions,
    CircuitBreaker, CircuitState, Clock, Executor, ManualClock, SystemClock,
};
