//! # HTTP Request Handlers
//!
//! Each handler is responsible for processing specific HTTP requests and
//! returning appropriate responses.
//!
//! ## Available Handlers
//!
//! - **Health** (`health`) - Datastore-aware health check and static status
//! - **Fallback** (`fallback`) - `404` for unmatched routes

mod fallback;
mod health;

pub use fallback::*;
pub use health::*;
