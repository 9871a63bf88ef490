//! Configuration schema definitions.
//!
//! This module defines the configuration file structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::resilience::types::BreakerConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Registry behaviour and default breaker settings.
    pub registry: RegistryConfig,

    /// Explicitly registered breakers, keyed by name.
    pub breakers: BTreeMap<String, BreakerOverrides>,

    /// Operator API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GuardConfig {
    /// Config for auto-created breakers, or `None` when auto-creation is off.
    pub fn default_breaker_config(&self) -> Option<BreakerConfig> {
        self.registry
            .auto_create
            .then(|| self.registry.defaults.to_breaker_config())
    }

    /// Declared breakers with overrides applied on top of the defaults.
    pub fn declared_breakers(&self) -> impl Iterator<Item = (&str, BreakerConfig)> + '_ {
        self.breakers.iter().map(|(name, overrides)| {
            let settings = overrides.apply(&self.registry.defaults);
            (name.as_str(), settings.to_breaker_config())
        })
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Create unseen breakers on first use with `defaults`.
    pub auto_create: bool,

    /// Settings for auto-created breakers, and the base for declared ones.
    pub defaults: BreakerSettings,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auto_create: true,
            defaults: BreakerSettings::default(),
        }
    }
}

/// Breaker settings as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Time spent OPEN before a trial call, in milliseconds.
    pub recovery_timeout_ms: u64,

    /// Consecutive trial successes that close the circuit.
    pub success_threshold: u32,

    /// Per-call deadline in milliseconds.
    pub call_timeout_ms: u64,

    /// Concurrent trial calls allowed while HALF_OPEN.
    pub max_concurrent_trial_calls: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            success_threshold: 2,
            call_timeout_ms: 20_000,
            max_concurrent_trial_calls: 1,
        }
    }
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_millis(self.recovery_timeout_ms),
            success_threshold: self.success_threshold,
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            max_concurrent_trial_calls: self.max_concurrent_trial_calls,
        }
    }
}

/// Per-breaker overrides. Missing keys inherit the registry defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerOverrides {
    pub failure_threshold: Option<u32>,
    pub recovery_timeout_ms: Option<u64>,
    pub success_threshold: Option<u32>,
    pub call_timeout_ms: Option<u64>,
    pub max_concurrent_trial_calls: Option<u32>,
}

impl BreakerOverrides {
    pub fn apply(&self, base: &BreakerSettings) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold.unwrap_or(base.failure_threshold),
            recovery_timeout_ms: self.recovery_timeout_ms.unwrap_or(base.recovery_timeout_ms),
            success_threshold: self.success_threshold.unwrap_or(base.success_threshold),
            call_timeout_ms: self.call_timeout_ms.unwrap_or(base.call_timeout_ms),
            max_concurrent_trial_calls: self
                .max_concurrent_trial_calls
                .unwrap_or(base.max_concurrent_trial_calls),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
