//! # Middleware Components
//!
//! Cross-cutting request processing: rate limiting, request logging,
//! security headers and CORS.

pub mod rate_limit;
pub mod request_logger;
pub mod security;

pub use rate_limit::{RateLimitDecision, RateLimiter, rate_limit_middleware};
pub use request_logger::request_logger;
pub use security::{cors_layer, security_headers};
