//! # Utility Modules
//!
//! This module contains constants and validators used throughout the service.
//!
//! ## Available Utilities
//!
//! - **Constants** (`constant`) - Timeouts, limits, and configuration defaults
//! - **Validators** (`validator`) - Regex patterns for configuration validation

pub mod constant;
pub mod validator;
