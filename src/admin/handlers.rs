use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::admin::AdminState;
use crate::resilience::error::BreakerError;
use crate::resilience::types::{BreakerSnapshot, CircuitState};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub breakers: usize,
}

/// Wire form of a breaker snapshot. Instants become relative milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub in_flight_trial_calls: u32,
    pub opened_ms_ago: Option<u64>,
    pub retry_after_ms: Option<u64>,
    pub config: BreakerConfigView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfigView {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub success_threshold: u32,
    pub call_timeout_ms: u64,
    pub max_concurrent_trial_calls: u32,
}

impl From<BreakerSnapshot> for BreakerStatus {
    fn from(snapshot: BreakerSnapshot) -> Self {
        let retry_after_ms = snapshot.retry_after().map(millis);
        let opened_ms_ago = snapshot.open_for().map(millis);
        let healthy = snapshot.is_healthy();
        let config = &snapshot.config;

        Self {
            config: BreakerConfigView {
                failure_threshold: config.failure_threshold,
                recovery_timeout_ms: millis(config.recovery_timeout),
                success_threshold: config.success_threshold,
                call_timeout_ms: millis(config.call_timeout),
                max_concurrent_trial_calls: config.max_concurrent_trial_calls,
            },
            name: snapshot.name,
            state: snapshot.state,
            healthy,
            consecutive_failures: snapshot.consecutive_failures,
            consecutive_successes: snapshot.consecutive_successes,
            in_flight_trial_calls: snapshot.in_flight_trial_calls,
            opened_ms_ago,
            retry_after_ms,
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Registry errors rendered as JSON.
#[derive(Debug)]
pub struct AdminError(BreakerError);

impl From<BreakerError> for AdminError {
    fn from(e: BreakerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            BreakerError::UnknownBreaker(_) => StatusCode::NOT_FOUND,
            BreakerError::DuplicateBreaker(_) => StatusCode::CONFLICT,
            BreakerError::Configuration { .. } => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        breakers: state.registry.len(),
    })
}

pub async fn list_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerStatus>> {
    Json(state.registry.list_all().map(BreakerStatus::from).collect())
}

pub async fn breaker_health(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerStatus>, AdminError> {
    Ok(Json(state.registry.snapshot(&name)?.into()))
}

pub async fn reset_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerStatus>, AdminError> {
    let snapshot = state.registry.reset(&name)?;
    Ok(Json(snapshot.into()))
}

pub async fn force_open_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerStatus>, AdminError> {
    let snapshot = state.registry.force_open(&name)?;
    Ok(Json(snapshot.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::types::BreakerConfig;
    use std::time::Instant;

    #[test]
    fn test_huge_durations_saturate() {
        let now = Instant::now();
        let snapshot = BreakerSnapshot {
            name: "inference".to_string(),
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            in_flight_trial_calls: 0,
            opened_at: None,
            next_attempt_allowed_at: None,
            taken_at: now,
            config: BreakerConfig {
                recovery_timeout: Duration::MAX,
                call_timeout: Duration::from_millis(1500),
                ..Default::default()
            },
        };

        let status = BreakerStatus::from(snapshot);
        assert_eq!(status.config.recovery_timeout_ms, u64::MAX);
        assert_eq!(status.config.call_timeout_ms, 1500);
        assert!(status.healthy);
    }
}
