/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::state::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub backend: String,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn check_database(state: &AppState) -> ServiceCheck {
    let Some(pool) = &state.pool else {
        return ServiceCheck {
            status: "not configured".to_string(),
            response_time_ms: None,
            error: None,
        };
    };
    match crate::db::health_check(pool).await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            response_time_ms: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            ServiceCheck {
                status: "unhealthy".to_string(),
                response_time_ms: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/database - Database health check
pub async fn health_database(State(state): State<AppState>) -> (StatusCode, Json<ServiceCheck>) {
    let check = check_database(&state).await;
    let status = if check.status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(check))
}

/// GET /health/ready - Readiness check
/// The in-memory backend is always ready; Postgres must answer a probe.
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database = check_database(&state).await;
    let is_ready = database.status != "unhealthy";

    let response = ReadyResponse {
        status: if is_ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: SERVER_START.elapsed().as_secs(),
        backend: state.backend_name().to_string(),
        database: database.status,
        reason: (!is_ready).then(|| "Database is not healthy".to_string()),
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
