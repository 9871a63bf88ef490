//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the breaker registry from validated configuration
//! - Apply reloaded configuration to a live registry
//!
//! # Design Decisions
//! - Fail fast: any invalid breaker config at startup is fatal
//! - Reloads are additive: new names are registered, existing breakers
//!   keep the config they were created with

use std::sync::Arc;

use crate::config::schema::GuardConfig;
use crate::resilience::clock::Clock;
use crate::resilience::error::BreakerError;
use crate::resilience::registry::BreakerRegistry;

/// Build a registry holding every breaker declared in `config`.
pub fn build_registry(
    config: &GuardConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<BreakerRegistry>, BreakerError> {
    let registry = BreakerRegistry::with_clock(clock);
    registry.set_default_config(config.default_breaker_config())?;

    for (name, breaker_config) in config.declared_breakers() {
        registry.register(name, breaker_config)?;
    }

    tracing::info!(
        breakers = registry.len(),
        auto_create = config.registry.auto_create,
        "Breaker registry initialized"
    );
    Ok(Arc::new(registry))
}

/// Apply a reloaded config. Returns the names of newly registered breakers.
pub fn apply_reload(registry: &BreakerRegistry, config: &GuardConfig) -> Vec<String> {
    if let Err(e) = registry.set_default_config(config.default_breaker_config()) {
        tracing::error!(error = %e, "Rejected reloaded default breaker config");
    }

    let mut added = Vec::new();
    for (name, breaker_config) in config.declared_breakers() {
        if registry.contains(name) {
            tracing::debug!(breaker = %name, "Breaker exists; keeping its original config");
            continue;
        }
        match registry.register(name, breaker_config) {
            Ok(_) => added.push(name.to_string()),
            // Lost a race with lazy creation; the existing breaker stays.
            Err(BreakerError::DuplicateBreaker(_)) => {}
            Err(e) => tracing::error!(breaker = %name, error = %e, "Failed to register breaker"),
        }
    }

    tracing::info!(added = added.len(), "Configuration reload applied");
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::resilience::clock::SystemClock;

    #[test]
    fn test_build_registry_registers_declared_breakers() {
        let config = parse_config(
            r#"
            [registry]
            auto_create = false

            [breakers.inference]
            failure_threshold = 3

            [breakers.embeddings]
            "#,
        )
        .unwrap();

        let registry = build_registry(&config, Arc::new(SystemClock)).unwrap();
        assert_eq!(registry.names(), vec!["embeddings".to_string(), "inference".to_string()]);
        assert_eq!(registry.get("inference").unwrap().config().failure_threshold, 3);
        assert!(registry.resolve("unknown").is_err());
    }

    #[test]
    fn test_reload_is_additive() {
        let initial = parse_config("[breakers.inference]\nfailure_threshold = 3\n").unwrap();
        let registry = build_registry(&initial, Arc::new(SystemClock)).unwrap();

        let reloaded = parse_config(
            r#"
            [registry]
            auto_create = false

            [breakers.inference]
            failure_threshold = 9

            [breakers.search]
            "#,
        )
        .unwrap();

        let added = apply_reload(&registry, &reloaded);
        assert_eq!(added, vec!["search".to_string()]);
        assert_eq!(registry.get("inference").unwrap().config().failure_threshold, 3);
        assert!(registry.default_config().is_none());
    }
}
