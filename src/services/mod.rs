//! # Services
//!
//! Components that talk to systems outside the process.
//!
//! ## Available Services
//!
//! - **Database** (`database`) - Connection state and health checks for Astra DB
//! - **Astra** (`astra`) - Driver traits and the REST gateway implementation

pub mod astra;
pub mod database;
