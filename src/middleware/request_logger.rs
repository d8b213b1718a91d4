//! # Request Logging
//!
//! Emits one event per completed request. Monitoring probes hitting the
//! health and status endpoints are not logged.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::ErrorMessage;
use crate::models::AppState;

/// Request logging middleware
///
/// Runs the rest of the stack inside a `request` span carrying method, path
/// and a fresh request id, so events logged by handlers are attributed to
/// the request. After completion it logs at:
///
/// - `info` for status codes below 400
/// - `warn` for 4xx
/// - `error` for 5xx, including the error message when one is attached
pub async fn request_logger(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = Uuid::new_v4();
    let span = info_span!("request", %method, %path, %request_id);

    let started = Instant::now();
    let response = next.run(req).instrument(span.clone()).await;

    if state.is_quiet_path(&path) {
        return response;
    }

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    let error_message = response
        .extensions()
        .get::<ErrorMessage>()
        .map(|ErrorMessage(message)| message.as_str());

    span.in_scope(|| match (status, error_message) {
        (500.., Some(message)) => {
            error!(status, latency_ms, "{method} {path} {status} - {message}")
        }
        (500.., None) => error!(status, latency_ms, "{method} {path} {status}"),
        (400..=499, _) => warn!(status, latency_ms, "{method} {path} {status}"),
        _ => info!(status, latency_ms, "{method} {path} {status}"),
    });

    response
}
