use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::handlers::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: ComponentStatus,
    pub database: ComponentHealth,
    pub response_time_ms: u64,
}

/// Liveness probe; answers as long as the process serves requests
#[utoipa::path(
    get,
    path = "/healthz",
    summary = "Liveness probe",
    responses((status = 200, description = "Service is running", body = LivenessResponse)),
    tag = "health"
)]
pub async fn liveness_check() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: ComponentStatus::Up,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness probe; checks that the database answers
#[utoipa::path(
    get,
    path = "/healthz/ready",
    summary = "Readiness probe",
    responses(
        (status = 200, description = "Ready to serve traffic", body = ReadinessResponse),
        (status = 503, description = "Database unreachable", body = ReadinessResponse)
    ),
    tag = "health"
)]
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, database) = match db_result {
        Ok(()) => (
            StatusCode::OK,
            ComponentHealth {
                status: ComponentStatus::Up,
                latency_ms: Some(latency_ms),
                error: None,
            },
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ComponentHealth {
                status: ComponentStatus::Down,
                latency_ms: None,
                error: Some(e.response_message()),
            },
        ),
    };

    (
        status,
        Json(ReadinessResponse {
            status: database.status,
            database,
            response_time_ms: start.elapsed().as_millis() as u64,
        }),
    )
}

/// Health check routes, always served without authentication
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(liveness_check))
        .route("/healthz/ready", get(readiness_check))
}
