//! # Astra DB Driver
//!
//! The connector talks to the datastore through two traits so that the real
//! driver can be swapped for an in-memory one in tests.
//!
//! ## Implementations
//!
//! - [`AstraDriver`] - Authenticates against the database's REST gateway and
//!   executes CQL statements over HTTPS

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use super::database::DatabaseError;
use crate::config::DatabaseConfig;

const TOKEN_HEADER: &str = "X-Cassandra-Token";

/// Everything a driver needs to open a session.
#[derive(Clone)]
pub struct ClientOptions {
    pub secure_connect_bundle: PathBuf,
    pub username: String,
    pub password: String,
    pub keyspace: String,
    pub endpoint: String,
}

impl ClientOptions {
    pub fn new(config: &DatabaseConfig, secure_connect_bundle: PathBuf) -> Self {
        Self {
            secure_connect_bundle,
            username: config.client_id.clone(),
            password: config.client_secret.clone(),
            keyspace: config.keyspace.clone(),
            endpoint: config.base_url(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("secure_connect_bundle", &self.secure_connect_bundle)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("keyspace", &self.keyspace)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Opens sessions against the datastore.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Establishes a new session.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the bundle cannot be read, the
    /// credentials are rejected, or the gateway is unreachable.
    async fn connect(
        &self,
        options: &ClientOptions,
    ) -> Result<Arc<dyn DatabaseSession>, DatabaseError>;
}

/// An established datastore session.
#[async_trait]
pub trait DatabaseSession: Send + Sync {
    /// Executes a single CQL statement and returns the raw response.
    async fn execute(&self, cql: &str) -> Result<Value, DatabaseError>;

    /// Closes the session. Subsequent calls to `execute` fail.
    async fn shutdown(&self) -> Result<(), DatabaseError>;
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(rename = "authToken")]
    auth_token: String,
}

/// Production driver using the Astra REST gateway.
pub struct AstraDriver {
    http_client: reqwest::Client,
}

impl AstraDriver {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for AstraDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for AstraDriver {
    #[instrument(skip_all, fields(endpoint = %options.endpoint, keyspace = %options.keyspace))]
    async fn connect(
        &self,
        options: &ClientOptions,
    ) -> Result<Arc<dyn DatabaseSession>, DatabaseError> {
        let bundle = &options.secure_connect_bundle;
        tokio::fs::metadata(bundle)
            .await
            .map_err(|source| DatabaseError::BundleUnreadable {
                path: bundle.clone(),
                source,
            })?;
        debug!(bundle = %bundle.display(), "Secure connect bundle found");

        let response = self
            .http_client
            .post(format!("{}/api/rest/v1/auth", options.endpoint))
            .json(&json!({
                "username": options.username,
                "password": options.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatabaseError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let AuthResponse { auth_token } = response.json().await?;
        info!("Authenticated against Astra DB gateway");

        Ok(Arc::new(AstraSession {
            http_client: self.http_client.clone(),
            endpoint: options.endpoint.clone(),
            keyspace: options.keyspace.clone(),
            auth_token,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Session bound to one keyspace and one auth token.
pub struct AstraSession {
    http_client: reqwest::Client,
    endpoint: String,
    keyspace: String,
    auth_token: String,
    closed: AtomicBool,
}

#[async_trait]
impl DatabaseSession for AstraSession {
    #[instrument(skip(self), fields(keyspace = %self.keyspace))]
    async fn execute(&self, cql: &str) -> Result<Value, DatabaseError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DatabaseError::Closed);
        }

        let response = self
            .http_client
            .post(format!("{}/api/rest/v2/cql", self.endpoint))
            .query(&[("keyspaceQP", self.keyspace.as_str())])
            .header(TOKEN_HEADER, &self.auth_token)
            .header(CONTENT_TYPE, "text/plain")
            .body(cql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatabaseError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    async fn shutdown(&self) -> Result<(), DatabaseError> {
        self.closed.store(true, Ordering::Release);
        debug!("Astra session closed");
        Ok(())
    }
}
