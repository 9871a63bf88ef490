//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call through a named breaker:
//!     → executor.rs (resolve breaker, gate, run, report)
//!     → registry.rs (lookup or lazy creation by name)
//!     → circuit_breaker.rs (admission decision, trial slot reservation)
//!     → timeouts.rs (enforce call deadline)
//!     → circuit_breaker.rs (record outcome, maybe transition)
//!
//! Operators:
//!     → registry.rs (snapshots, reset, force-open)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency name, shared by every caller of that name
//! - One mutex per breaker; never held while the wrapped call runs
//! - Registry map is sharded and independent of breaker locks
//! - Every "now" read goes through `Clock`
//! - Retries are the caller's business; a rejection is final for that call

pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod executor;
pub mod registry;
pub mod timeouts;
pub mod types;

pub use circuit_breaker::CircuitBreaker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BreakerError, CallError};
pub use executor::Executor;
pub use registry::{BreakerRegistry, Snapshots};
pub use types::{BreakerConfig, BreakerSnapshot, CallOptions, CircuitState};
