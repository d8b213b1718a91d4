//! # Health and Status Handlers
//!
//! Endpoints for load balancers and monitoring systems. `/health` reflects
//! datastore connectivity; `/status` only shows that the process is serving.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::config::Environment;
use crate::models::AppState;
use crate::services::database::DatabaseHealth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Body of `GET /health` when the probe ran.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Seconds since startup.
    pub uptime: f64,
    pub database: DatabaseHealth,
}

/// Body of `GET /health` when the probe itself failed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnhealthyResponse {
    pub status: HealthStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /status`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub version: String,
    pub environment: Environment,
}

/// Reports service health based on datastore connectivity.
///
/// GET {prefix}/health
///
/// # Returns
///
/// - `200 OK` with [`HealthResponse`] - the datastore is connected
/// - `503 Service Unavailable` with [`HealthResponse`] - the datastore is not connected
/// - `503 Service Unavailable` with [`UnhealthyResponse`] - the probe failed to run
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and datastore are healthy", body = HealthResponse),
        (status = 503, description = "Datastore is not connected, or the probe failed", body = UnhealthyResponse),
    ),
    tag = "system"
)]
#[instrument(skip_all)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Response {
    debug!("Health check endpoint accessed");

    match state.database.probe().await {
        Ok(database) => {
            let (status_code, status) = if database.connected {
                (StatusCode::OK, HealthStatus::Healthy)
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
            };

            let body = HealthResponse {
                status,
                timestamp: OffsetDateTime::now_utc(),
                uptime: state.uptime(),
                database,
            };
            (status_code, Json(body)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Health check failed");
            let body = UnhealthyResponse {
                status: HealthStatus::Unhealthy,
                timestamp: OffsetDateTime::now_utc(),
                error: Some(e.to_string()),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// Reports that the service is up, with its version and environment.
///
/// GET {prefix}/status
///
/// Always returns `200 OK` with [`StatusResponse`].
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service is running", body = StatusResponse),
    ),
    tag = "system"
)]
#[instrument(skip_all)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        timestamp: OffsetDateTime::now_utc(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment,
    })
}
