//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and durations > 0)
//! - Validate addresses and log level
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{BreakerSettings, GuardConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending key.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_settings("registry.defaults", &config.registry.defaults, &mut errors);

    for (name, overrides) in &config.breakers {
        if name.trim().is_empty() {
            errors.push(ValidationError::new("breakers", "breaker name must not be empty"));
            continue;
        }
        let settings = overrides.apply(&config.registry.defaults);
        check_settings(&format!("breakers.{}", name), &settings, &mut errors);
    }

    if config.admin.enabled {
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin API is enabled",
            ));
        }
        check_address("admin.bind_address", &config.admin.bind_address, &mut errors);
    }

    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("expected one of {:?}", LOG_LEVELS),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_settings(prefix: &str, settings: &BreakerSettings, errors: &mut Vec<ValidationError>) {
    let positive = [
        ("failure_threshold", settings.failure_threshold as u64),
        ("recovery_timeout_ms", settings.recovery_timeout_ms),
        ("success_threshold", settings.success_threshold as u64),
        ("call_timeout_ms", settings.call_timeout_ms),
        ("max_concurrent_trial_calls", settings.max_concurrent_trial_calls as u64),
    ];

    for (key, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(format!("{}.{}", prefix, key), "must be positive"));
        }
    }
}

fn check_address(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address '{}'", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BreakerOverrides;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.registry.defaults.failure_threshold = 0;
        config.breakers.insert(
            "inference".to_string(),
            BreakerOverrides {
                call_timeout_ms: Some(0),
                ..Default::default()
            },
        );
        config.admin.enabled = true;
        config.admin.bind_address = "not-an-address".to_string();
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"registry.defaults.failure_threshold"));
        // Inherited from the broken defaults as well as its own override.
        assert!(fields.contains(&"breakers.inference.failure_threshold"));
        assert!(fields.contains(&"breakers.inference.call_timeout_ms"));
        assert!(fields.contains(&"admin.api_key"));
        assert!(fields.contains(&"admin.bind_address"));
        assert!(fields.contains(&"observability.log_level"));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new("admin.api_key", "must be set");
        assert_eq!(err.to_string(), "admin.api_key: must be set");
    }
}
