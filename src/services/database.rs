//! # Database Connector
//!
//! Owns the single datastore session of the process and its connection state.
//!
//! ## States
//!
//! - **Disconnected** - initial state, and the state after [`Database::disconnect`]
//! - **Connected (mock)** - no secure connect bundle configured; nothing is
//!   contacted and every health check succeeds. Refused in production.
//! - **Connected (real)** - a driver session is open
//!
//! There is no automatic reconnection. A dropped session is only noticed by
//! the next health check, which reports it without leaving the connected
//! state; see [`ConnectionStatus`] for the two flags this produces.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::astra::{ClientOptions, DatabaseDriver, DatabaseSession};
use crate::config::{DatabaseConfig, Environment};
use crate::utils::constant::{LIVENESS_QUERY, NOT_CONNECTED_MESSAGE};

/// Errors that can occur while talking to the datastore
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("secure connect bundle `{}` is unreadable: {source}", path.display())]
    BundleUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to database gateway failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("database gateway rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("database session is closed")]
    Closed,

    #[error("secure connect bundle is required in production")]
    MockModeForbidden,
}

/// Result of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseHealth {
    pub fn healthy(keyspace: impl Into<String>) -> Self {
        Self {
            connected: true,
            keyspace: Some(keyspace.into()),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            keyspace: None,
            error: Some(error.into()),
        }
    }
}

/// Snapshot of the connector flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// Last-known state: set by `connect`, cleared by `disconnect`.
    pub connected: bool,
    /// Whether the most recent liveness check (or the connect itself) succeeded.
    pub verified: bool,
}

/// Source of database health information for the HTTP layer.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Reports the current health of the datastore.
    ///
    /// # Errors
    ///
    /// An `Err` means the probe itself could not run, as opposed to a
    /// datastore that was reached and found unhealthy.
    async fn probe(&self) -> Result<DatabaseHealth, DatabaseError>;
}

enum ConnectionState {
    Disconnected,
    /// `None` in mock mode.
    Connected(Option<Arc<dyn DatabaseSession>>),
}

struct Inner {
    state: ConnectionState,
    verified: bool,
}

/// Connector to the Astra DB instance.
///
/// `connect` and `disconnect` are serialized by an async lock so that
/// concurrent callers observe them as atomic transitions. The state itself
/// sits behind a short-lived synchronous lock, which keeps the accessors
/// non-async.
pub struct Database {
    config: DatabaseConfig,
    environment: Environment,
    driver: Arc<dyn DatabaseDriver>,
    transition: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
}

impl Database {
    /// Creates a disconnected connector.
    pub fn new(
        config: DatabaseConfig,
        environment: Environment,
        driver: Arc<dyn DatabaseDriver>,
    ) -> Self {
        Self {
            config,
            environment,
            driver,
            transition: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                verified: false,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Establishes the connection. Calling it while connected is a no-op.
    ///
    /// Without a secure connect bundle the connector enters mock mode, unless
    /// running in production where this is an error.
    ///
    /// # Errors
    ///
    /// Driver failures are logged and returned; the connector stays
    /// disconnected.
    #[instrument(skip(self), fields(keyspace = %self.config.keyspace))]
    pub async fn connect(&self) -> Result<(), DatabaseError> {
        let _transition = self.transition.lock().await;

        if self.is_connected() {
            info!("Database already connected");
            return Ok(());
        }

        let Some(bundle) = self.config.secure_connect_bundle.clone() else {
            if self.environment.is_production() {
                error!("Secure connect bundle not configured in production");
                return Err(DatabaseError::MockModeForbidden);
            }

            warn!("Secure connect bundle not configured. Using mock connection for development.");
            let mut inner = self.inner();
            inner.state = ConnectionState::Connected(None);
            inner.verified = true;
            return Ok(());
        };

        let options = ClientOptions::new(&self.config, bundle);
        let session = match self.driver.connect(&options).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to connect to Astra DB");
                return Err(e);
            }
        };

        {
            let mut inner = self.inner();
            inner.state = ConnectionState::Connected(Some(session));
            inner.verified = true;
        }
        info!("Successfully connected to Astra DB");

        self.bootstrap_keyspace().await
    }

    /// Closes the connection. Calling it while disconnected is a no-op.
    ///
    /// The connector is disconnected even when closing the session fails;
    /// the failure is still returned.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), DatabaseError> {
        let _transition = self.transition.lock().await;

        let session = {
            let mut inner = self.inner();
            let previous = std::mem::replace(&mut inner.state, ConnectionState::Disconnected);
            inner.verified = false;
            match previous {
                ConnectionState::Disconnected => return Ok(()),
                ConnectionState::Connected(session) => session,
            }
        };

        if let Some(session) = session
            && let Err(e) = session.shutdown().await
        {
            error!(error = %e, "Failed to close Astra DB session");
            return Err(e);
        }

        info!("Disconnected from Astra DB");
        Ok(())
    }

    /// Checks connectivity, issuing a liveness query when a real session exists.
    ///
    /// Never fails: problems are reported through [`DatabaseHealth::error`].
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> DatabaseHealth {
        let session = match &self.inner().state {
            ConnectionState::Disconnected => {
                return DatabaseHealth::unhealthy(NOT_CONNECTED_MESSAGE);
            }
            ConnectionState::Connected(session) => session.clone(),
        };

        let Some(session) = session else {
            return DatabaseHealth::healthy(&self.config.keyspace);
        };

        let outcome = session.execute(LIVENESS_QUERY).await;
        self.inner().verified = outcome.is_ok();

        match outcome {
            Ok(_) => DatabaseHealth::healthy(&self.config.keyspace),
            Err(e) => {
                error!(error = %e, "Database health check failed");
                DatabaseHealth::unhealthy(e.to_string())
            }
        }
    }

    /// The open session, if any. Always `None` in mock mode.
    pub fn client(&self) -> Option<Arc<dyn DatabaseSession>> {
        match &self.inner().state {
            ConnectionState::Connected(session) => session.clone(),
            ConnectionState::Disconnected => None,
        }
    }

    /// Last-known connection state.
    pub fn is_connected(&self) -> bool {
        matches!(self.inner().state, ConnectionState::Connected(_))
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        let inner = self.inner();
        ConnectionStatus {
            connected: matches!(inner.state, ConnectionState::Connected(_)),
            verified: inner.verified,
        }
    }

    pub fn keyspace(&self) -> &str {
        &self.config.keyspace
    }

    // Reserved for schema setup.
    async fn bootstrap_keyspace(&self) -> Result<(), DatabaseError> {
        if self.client().is_none() {
            return Ok(());
        }

        info!("Bootstrapping keyspace...");
        info!("Keyspace bootstrap completed successfully");
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for Database {
    async fn probe(&self) -> Result<DatabaseHealth, DatabaseError> {
        Ok(self.check_health().await)
    }
}
