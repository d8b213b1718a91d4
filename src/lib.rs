//! # Astra Service - Backend Skeleton
//!
//! An HTTP service exposing health and status endpoints, backed by a
//! connector to a managed Astra DB instance.
//!
//! ## Modules
//!
//! - [`config`] - Validated environment-based configuration
//! - [`docs`] - OpenAPI document and Swagger UI
//! - [`error`] - Centralized error to response mapping
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Rate limiting, request logging, security headers, CORS
//! - [`models`] - Shared application state
//! - [`server`] - Startup and bounded graceful shutdown
//! - [`services`] - Datastore connector and driver
//! - [`telemetry`] - Logging setup
//! - [`utils`] - Constants and validators

pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;
pub mod services;
pub mod telemetry;
pub mod utils;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer,
    set_header::SetResponseHeaderLayer,
};
use tracing::info;

use crate::config::Config;
use crate::docs::swagger_ui;
use crate::error::handle_panic;
use crate::handlers::{get_health, get_status, not_found};
use crate::middleware::{cors_layer, rate_limit_middleware, request_logger, security_headers};
use crate::models::AppState;
use crate::services::database::HealthProbe;
use crate::utils::constant::*;

/// Creates an Axum router with application routes, middleware, and state.
///
/// # Arguments
///
/// * `config` - Validated service configuration
/// * `database` - Health source for `/health`. In production this is the
///   [`services::database::Database`] connector; tests may pass their own.
///
/// # Layers
///
/// From the outside in: security headers, CORS, compression, body size
/// limit, request logging, rate limiting, panic catching. Routes live under
/// the configured API prefix; everything else hits the `404` fallback.
/// In development, Swagger UI is mounted at `/api-docs`.
///
/// Must be called from within a Tokio runtime, as it spawns the rate limiter
/// cleanup task. The task ends once the router is dropped.
pub fn app(config: Arc<Config>, database: Arc<dyn HealthProbe>) -> Router {
    let state = Arc::new(AppState::new(Arc::clone(&config), database));

    let weak_state = Arc::downgrade(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        interval.tick().await; // first tick completes immediately
        loop {
            interval.tick().await;
            let Some(state) = weak_state.upgrade() else {
                break;
            };
            state.cleanup_expired_entries();
        }
    });

    let api_routes = Router::new()
        .route("/health", get(get_health))
        .route("/status", get(get_status));

    let prefix = config.server.normalized_prefix();
    info!(prefix, "Mounting API routes");
    let mut routes = if prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(prefix, api_routes)
    };

    if config.environment.is_development() {
        info!(path = API_DOCS_PATH, "Serving API documentation");
        routes = routes.merge(swagger_ui(prefix));
    }

    let mut router = routes
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(Arc::clone(&state), rate_limit_middleware))
        .layer(from_fn_with_state(Arc::clone(&state), request_logger))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors.origins));

    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router.with_state(state)
}
