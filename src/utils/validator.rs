//! # Configuration Validation Utilities
//!
//! Regex patterns and custom rules used by the `validator` derives on the
//! configuration types.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

/// API prefix validation regex pattern
///
/// The prefix must be an absolute path made of URL-safe segments.
///
/// # Examples
///
/// - `/api` ✓ Valid
/// - `/api/v1` ✓ Valid
/// - `api` ✗ Invalid, not absolute
/// - `/api?x=1` ✗ Invalid characters
pub static API_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[A-Za-z0-9._~/-]*$").expect("Failed to compile API prefix regex")
});

/// Validates the CORS origin list.
///
/// The wildcard origin `*` cannot be combined with credentialed requests, so
/// it is rejected here rather than when the CORS layer is built.
///
/// # Examples
///
/// - `["http://localhost:3000"]` ✓ Valid
/// - `["*"]` ✗ Invalid
/// - `["https://app.example.com", "*"]` ✗ Invalid
pub fn validate_origins(origins: &[String]) -> Result<(), ValidationError> {
    if origins.iter().any(|origin| origin == "*") {
        return Err(ValidationError::new("wildcard_origin").with_message(Cow::Borrowed(
            "wildcard origin `*` is not allowed with credentialed CORS",
        )));
    }
    Ok(())
}
