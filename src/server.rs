//! # Server Lifecycle
//!
//! Runs the service through an explicit sequence of phases:
//!
//! 1. **Starting** - router built, datastore connection started in the background
//! 2. **Serving** - accepting connections until the shutdown future resolves
//! 3. **Draining** - no new connections; in-flight requests finish, then the
//!    datastore is disconnected
//! 4. **Stopped** - everything closed
//!
//! Draining is bounded: if it does not finish within the shutdown timeout
//! (measured from the shutdown signal), [`Server::run`] returns
//! [`ServerError::ShutdownTimeout`].

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::error::panic_message;
use crate::services::database::{Database, DatabaseError, HealthProbe};
use crate::utils::constant::SHUTDOWN_TIMEOUT;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to close database connection: {0}")]
    Disconnect(#[from] DatabaseError),

    #[error("forced shutdown after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("database connect task panicked: {0}")]
    ConnectPanicked(String),
}

/// Lifecycle phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Serving,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Phase::Starting => "starting",
            Phase::Serving => "serving",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(phase)
    }
}

fn enter(phase: Phase) {
    info!(%phase, "Lifecycle phase changed");
}

pub struct Server {
    config: Arc<Config>,
    database: Arc<Database>,
    shutdown_timeout: Duration,
}

impl Server {
    pub fn new(config: Arc<Config>, database: Arc<Database>) -> Self {
        Self {
            config,
            database,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Overrides the bound on graceful shutdown.
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Binds the configured host and port.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.server.bind_address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Serves on `listener` until `shutdown` resolves, then drains and
    /// disconnects the datastore.
    ///
    /// # Errors
    ///
    /// - [`ServerError::ShutdownTimeout`] if draining exceeds the timeout
    /// - [`ServerError::Disconnect`] if closing the datastore fails
    /// - [`ServerError::Io`] if the listener fails
    /// - [`ServerError::ConnectPanicked`] if the background connect task panics
    #[instrument(skip_all)]
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        enter(Phase::Starting);
        let address = listener.local_addr()?;
        let router = crate::app(
            Arc::clone(&self.config),
            Arc::clone(&self.database) as Arc<dyn HealthProbe>,
        );

        info!(
            %address,
            environment = %self.config.environment,
            "Server started"
        );

        let database = Arc::clone(&self.database);
        let connect_task = tokio::spawn(async move {
            match database.connect().await {
                Ok(()) => info!("Application initialized successfully"),
                Err(e) => error!(error = %e, "Failed to initialize application"),
            }
        });
        let connect_abort = connect_task.abort_handle();

        // Resolves only if the connect task panicked.
        let connect_panic = async {
            match connect_task.await {
                Err(e) if e.is_panic() => {
                    let payload = e.into_panic();
                    panic_message(payload.as_ref()).to_string()
                }
                _ => std::future::pending().await,
            }
        };

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            shutdown.await;
            trigger.cancel();
        });

        enter(Phase::Serving);
        let serve = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(token.clone().cancelled_owned());

        let drain = async {
            serve.await?;
            info!("HTTP server closed");

            connect_abort.abort();
            self.database.disconnect().await?;
            info!("Database connection closed");
            Ok::<(), ServerError>(())
        };

        let deadline = async {
            token.cancelled().await;
            enter(Phase::Draining);
            tokio::time::sleep(self.shutdown_timeout).await;
        };

        tokio::select! {
            result = drain => {
                result?;
                enter(Phase::Stopped);
                Ok(())
            }
            () = deadline => {
                error!(timeout = ?self.shutdown_timeout, "Forced shutdown after timeout");
                Err(ServerError::ShutdownTimeout(self.shutdown_timeout))
            }
            message = connect_panic => {
                error!(%message, "Database connect task panicked");
                Err(ServerError::ConnectPanicked(message))
            }
        }
    }
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "Shutdown signal received"),
        () = terminate => info!(signal = "SIGTERM", "Shutdown signal received"),
    }
}
