//! Named collection of circuit breakers.
//!
//! # Responsibilities
//! - Single place where breakers are created
//! - Share one breaker instance per name across all callers
//! - Lazy creation from a default config, when one is configured
//! - Snapshots and manual control for operators
//!
//! # Design Decisions
//! - Owned by the embedding application, no global instance
//! - `DashMap` shards keep lookups for different names independent
//! - Breaker locks are never taken while a map shard is locked

use arc_swap::ArcSwapOption;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::error::BreakerError;
use crate::resilience::types::{BreakerConfig, BreakerSnapshot};

/// Registry of circuit breakers keyed by dependency name.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: ArcSwapOption<BreakerConfig>,
    clock: Arc<dyn Clock>,
}

impl BreakerRegistry {
    /// Registry on the system clock, without auto-creation.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Registry driven by the given clock, without auto-creation.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config: ArcSwapOption::empty(),
            clock,
        }
    }

    /// Enable auto-creation of unseen names with `config`.
    pub fn with_default_config(self, config: BreakerConfig) -> Result<Self, BreakerError> {
        self.set_default_config(Some(config))?;
        Ok(self)
    }

    /// Replace the config used for auto-creation. Existing breakers keep theirs.
    pub fn set_default_config(&self, config: Option<BreakerConfig>) -> Result<(), BreakerError> {
        if let Some(config) = &config {
            config.validate("<default>")?;
        }
        self.default_config.store(config.map(Arc::new));
        Ok(())
    }

    pub fn default_config(&self) -> Option<BreakerConfig> {
        self.default_config.load_full().map(|c| (*c).clone())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Return the breaker for `name`, creating it with `default_config` if unseen.
    pub fn get_or_create(
        &self,
        name: &str,
        default_config: &BreakerConfig,
    ) -> Result<Arc<CircuitBreaker>, BreakerError> {
        if let Some(existing) = self.breakers.get(name) {
            return Ok(existing.value().clone());
        }

        let breaker = self.build(name, default_config.clone())?;
        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            tracing::info!(breaker = %name, "Circuit breaker created");
            breaker
        });
        Ok(entry.value().clone())
    }

    /// Register a breaker with an explicit config.
    pub fn register(
        &self,
        name: &str,
        config: BreakerConfig,
    ) -> Result<Arc<CircuitBreaker>, BreakerError> {
        let breaker = self.build(name, config)?;
        match self.breakers.entry(name.to_string()) {
            Entry::Occupied(_) => Err(BreakerError::DuplicateBreaker(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(breaker.clone());
                tracing::info!(breaker = %name, "Circuit breaker registered");
                Ok(breaker)
            }
        }
    }

    /// Look up an existing breaker.
    pub fn get(&self, name: &str) -> Result<Arc<CircuitBreaker>, BreakerError> {
        self.breakers
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BreakerError::UnknownBreaker(name.to_string()))
    }

    /// Lookup used on the call path: existing breaker, else lazy creation
    /// from the default config, else `UnknownBreaker`.
    pub fn resolve(&self, name: &str) -> Result<Arc<CircuitBreaker>, BreakerError> {
        if let Some(existing) = self.breakers.get(name) {
            return Ok(existing.value().clone());
        }
        match self.default_config.load_full() {
            Some(config) => self.get_or_create(name, &config),
            None => Err(BreakerError::UnknownBreaker(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.breakers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every breaker, sorted by name.
    ///
    /// Each snapshot is taken when the iterator reaches it. Cloning the
    /// iterator restarts it over the same set of breakers.
    pub fn list_all(&self) -> Snapshots {
        let mut breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|e| e.value().clone()).collect();
        breakers.sort_by(|a, b| a.name().cmp(b.name()));
        Snapshots {
            breakers: breakers.into_iter(),
        }
    }

    /// Snapshot of one breaker.
    pub fn snapshot(&self, name: &str) -> Result<BreakerSnapshot, BreakerError> {
        Ok(self.get(name)?.snapshot())
    }

    /// Force `name` CLOSED with zero counters.
    pub fn reset(&self, name: &str) -> Result<BreakerSnapshot, BreakerError> {
        let breaker = self.get(name)?;
        breaker.reset();
        Ok(breaker.snapshot())
    }

    /// Force `name` OPEN starting now.
    pub fn force_open(&self, name: &str) -> Result<BreakerSnapshot, BreakerError> {
        let breaker = self.get(name)?;
        breaker.force_open();
        Ok(breaker.snapshot())
    }

    /// Reset every breaker.
    pub fn reset_all(&self) {
        for breaker in self.handles() {
            breaker.reset();
        }
    }

    fn handles(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers.iter().map(|e| e.value().clone()).collect()
    }

    fn build(&self, name: &str, config: BreakerConfig) -> Result<Arc<CircuitBreaker>, BreakerError> {
        CircuitBreaker::new(name, config, self.clock.clone()).map(Arc::new)
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, finite sequence of breaker snapshots.
#[derive(Debug, Clone)]
pub struct Snapshots {
    breakers: std::vec::IntoIter<Arc<CircuitBreaker>>,
}

impl Iterator for Snapshots {
    type Item = BreakerSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        self.breakers.next().map(|b| b.snapshot())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.breakers.size_hint()
    }
}

impl ExactSizeIterator for Snapshots {}
