//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → lifecycle::startup builds the breaker registry from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → registry default config swapped, new breakers registered
//! ```
//!
//! # Design Decisions
//! - Breaker configs are captured at creation; reloads never alter a live breaker
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{AdminConfig, BreakerOverrides, BreakerSettings, GuardConfig, ObservabilityConfig, RegistryConfig};
pub use validation::ValidationError;
