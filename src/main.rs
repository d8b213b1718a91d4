use std::process::ExitCode;
use std::sync::Arc;

use astra_service::config::Config;
use astra_service::server::{Server, shutdown_signal};
use astra_service::services::{astra::AstraDriver, database::Database};
use astra_service::telemetry;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Configuration validation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init(&config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    telemetry::install_panic_hook();

    let database = Arc::new(Database::new(
        config.database.clone(),
        config.environment,
        Arc::new(AstraDriver::new()),
    ));
    let server = Server::new(Arc::clone(&config), database);

    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Failed to start server");
            return ExitCode::FAILURE;
        }
    };

    // A panic while serving surfaces here as a `JoinError`.
    let running = tokio::spawn(server.run(listener, shutdown_signal()));

    match running.await {
        Ok(Ok(())) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(error = %e, "Error during shutdown");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Server task failed");
            ExitCode::FAILURE
        }
    }
}
