//! # Rate Limiting
//!
//! Fixed-window request counting keyed by client IP address.
//!
//! Every response carries the standard `RateLimit-Limit`,
//! `RateLimit-Remaining` and `RateLimit-Reset` headers. Requests beyond the
//! configured ceiling within one window are rejected with
//! `429 Too Many Requests` and a `Retry-After` header.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::models::AppState;
use crate::utils::constant::RATE_LIMIT_MESSAGE;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window ends.
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// `reset_after` rounded up to whole seconds.
    pub fn reset_secs(&self) -> u64 {
        self.reset_after.as_secs() + u64::from(self.reset_after.subsec_nanos() > 0)
    }
}

/// Per-client fixed-window counters.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clients: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            clients: DashMap::new(),
        }
    }

    /// Counts one request from `client` and decides whether it may proceed.
    pub fn check(&self, client: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut entry = self.clients.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);

        RateLimitDecision {
            allowed: entry.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after: self
                .window
                .saturating_sub(now.duration_since(entry.started)),
        }
    }

    /// Drops windows that have ended. Returns the number of removed entries.
    pub fn purge_expired(&self) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, window| window.started.elapsed() < self.window);
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Identifies the client: socket address first, then the first
/// `X-Forwarded-For` hop, then `unknown`.
fn client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|hop| hop.trim().to_string())
        .filter(|hop| !hop.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn insert_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(
        RATE_LIMIT_REMAINING,
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        RATE_LIMIT_RESET,
        HeaderValue::from(decision.reset_secs()),
    );
}

/// Rate limiting middleware
///
/// # Returns
///
/// - **Under the limit**: the downstream response, with rate limit headers
/// - **Over the limit**: `429 Too Many Requests` with a fixed message
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    let decision = state.rate_limiter.check(&client);

    let mut response = if decision.allowed {
        debug!(%client, remaining = decision.remaining, "Request within rate limit");
        next.run(req).await
    } else {
        warn!(%client, limit = decision.limit, "Rate limit exceeded");
        let mut response = (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(decision.reset_secs()),
        );
        response
    };

    insert_headers(response.headers_mut(), &decision);
    response
}
