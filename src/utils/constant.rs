//! # Application Constants
//!
//! This module defines configuration constants used throughout the service.
//! These constants control timeouts, limits, and defaults that are not
//! exposed through environment variables.

use std::time::Duration;

/// Upper bound for a graceful shutdown
///
/// Once a termination signal arrives, draining in-flight requests and closing
/// the datastore connection must finish within this duration, otherwise the
/// process exits with a failure code.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum accepted request body size (10 MiB)
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Maximum number of client windows kept by the rate limiter before the
/// background task starts purging expired ones
pub const RATE_LIMIT_CACHE_CAPACITY: usize = 1_000;

/// Interval for the rate limiter cleanup task
pub const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Body returned with `429 Too Many Requests`
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Trivial query used to verify that a datastore session is alive
pub const LIVENESS_QUERY: &str = "SELECT now() FROM system.local";

/// Reported by the health check before any connection has been established
pub const NOT_CONNECTED_MESSAGE: &str = "Database not connected";

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;

/// Mount point of Swagger UI, served in development only.
pub const API_DOCS_PATH: &str = "/api-docs";
pub const API_DOCS_SPEC_PATH: &str = "/api-docs/openapi.json";
