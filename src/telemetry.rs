//! # Logging Setup
//!
//! Installs the process-wide `tracing` subscriber.
//!
//! - **Development**: human-readable, colored output
//! - **Everything else**: Bunyan-formatted JSON lines on stdout
//!
//! The level comes from `LOG_LEVEL`; `RUST_LOG`, when set, takes precedence.

use tracing::error;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

use crate::config::Config;
use crate::error::panic_message;

/// Installs the global subscriber for `config`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &Config) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_directive()));

    if config.environment.is_development() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(true).with_target(false))
            .try_init()
    } else {
        let formatting =
            BunyanFormattingLayer::new(env!("CARGO_PKG_NAME").to_string(), std::io::stdout);
        tracing_subscriber::registry()
            .with(filter)
            .with(JsonStorageLayer)
            .with(formatting)
            .try_init()
    }
}

/// Routes panics through `tracing` before the default hook runs.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|location| location.to_string())
            .unwrap_or_default();
        let backtrace = std::backtrace::Backtrace::capture();

        error!(
            payload = panic_message(info.payload()),
            %location,
            %backtrace,
            "Uncaught panic"
        );
        default_hook(info);
    }));
}
