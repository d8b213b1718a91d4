//! # Configuration
//!
//! Environment-based configuration for the service. The whole configuration is
//! read once at startup, defaults are applied to optional values, and the
//! result is validated as a unit: either every field is acceptable or startup
//! fails with a descriptive [`ConfigError`].
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `NODE_ENV` | `development` |
//! | `PORT` | `3001` |
//! | `HOST` | `0.0.0.0` |
//! | `API_PREFIX` | `/api` |
//! | `ASTRA_DB_ID` | required |
//! | `ASTRA_DB_REGION` | required |
//! | `ASTRA_DB_KEYSPACE` | required |
//! | `ASTRA_DB_CLIENT_ID` | required |
//! | `ASTRA_DB_CLIENT_SECRET` | required |
//! | `ASTRA_DB_SECURE_CONNECT_BUNDLE` | unset (mock connection) |
//! | `CORS_ORIGIN` | `http://localhost:3000` |
//! | `RATE_LIMIT_WINDOW_MS` | `900000` |
//! | `RATE_LIMIT_MAX_REQUESTS` | `100` |
//! | `LOG_LEVEL` | `info` |

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::utils::constant::*;
use crate::utils::validator::{API_PREFIX_REGEX, validate_origins};

/// Errors produced while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{key}` must be a positive integer, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },

    #[error("`{key}` must be one of [{allowed}], got `{value}`")]
    InvalidEnum {
        key: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Deployment environment, read from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    const ALLOWED: &'static str = "development, production, test";

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    #[inline]
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    #[inline]
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(()),
        }
    }
}

/// Log verbosity, read from `LOG_LEVEL`.
///
/// `fatal` has no direct `tracing` counterpart and is treated as `error`;
/// `silent` turns logging off entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
    Silent,
}

impl LogLevel {
    const ALLOWED: &'static str = "fatal, error, warn, info, debug, trace, silent";

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Fatal | LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
            LogLevel::Silent => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            "silent" => Ok(LogLevel::Silent),
            _ => Err(()),
        }
    }
}

/// Network binding of the HTTP server.
#[derive(Debug, Clone, Validate)]
pub struct ServerConfig {
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(regex(path = "*API_PREFIX_REGEX"))]
    pub api_prefix: String,
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API prefix without a trailing slash. A bare `/` becomes empty.
    pub fn normalized_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }
}

/// Credentials and location of the Astra DB instance.
#[derive(Clone, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub region: String,
    #[validate(length(min = 1))]
    pub keyspace: String,
    #[validate(length(min = 1))]
    pub client_id: String,
    #[validate(length(min = 1))]
    pub client_secret: String,
    /// Path to the secure connect bundle. When absent the connector runs in
    /// mock mode outside of production.
    pub secure_connect_bundle: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Base URL of the database's REST gateway.
    pub fn base_url(&self) -> String {
        format!(
            "https://{}-{}.apps.astra.datastax.com",
            self.id, self.region
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("id", &self.id)
            .field("region", &self.region)
            .field("keyspace", &self.keyspace)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("secure_connect_bundle", &self.secure_connect_bundle)
            .finish()
    }
}

#[derive(Debug, Clone, Validate)]
pub struct CorsConfig {
    /// Allowed origins, in the order given by `CORS_ORIGIN`.
    ///
    /// Unlike a plain comma split, entries are trimmed and empty entries are
    /// dropped, so `"a, b,"` yields `["a", "b"]`. The wildcard `*` is rejected.
    #[validate(length(min = 1), custom(function = "validate_origins"))]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct RateLimitConfig {
    #[validate(range(min = 1))]
    pub window_ms: u64,
    #[validate(range(min = 1))]
    pub max_requests: u32,
}

impl RateLimitConfig {
    #[inline]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Immutable, validated service configuration.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    pub environment: Environment,
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub cors: CorsConfig,
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,
    pub log_level: LogLevel,
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present;
    /// variables already set in the environment take precedence over it.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds and validates the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset for optional fields and as empty
    /// (thus invalid) for required ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let environment = parse_enum(
            "NODE_ENV",
            get("NODE_ENV"),
            Environment::default(),
            Environment::ALLOWED,
        )?;
        let log_level = parse_enum(
            "LOG_LEVEL",
            get("LOG_LEVEL"),
            LogLevel::default(),
            LogLevel::ALLOWED,
        )?;

        let server = ServerConfig {
            port: parse_number("PORT", get("PORT"), DEFAULT_PORT)?,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            api_prefix: get("API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
        };

        let database = DatabaseConfig {
            id: get("ASTRA_DB_ID").unwrap_or_default(),
            region: get("ASTRA_DB_REGION").unwrap_or_default(),
            keyspace: get("ASTRA_DB_KEYSPACE").unwrap_or_default(),
            client_id: get("ASTRA_DB_CLIENT_ID").unwrap_or_default(),
            client_secret: get("ASTRA_DB_CLIENT_SECRET").unwrap_or_default(),
            secure_connect_bundle: get("ASTRA_DB_SECURE_CONNECT_BUNDLE").map(PathBuf::from),
        };

        let cors = CorsConfig {
            origins: split_origins(
                &get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            ),
        };

        let rate_limit = RateLimitConfig {
            window_ms: parse_number(
                "RATE_LIMIT_WINDOW_MS",
                get("RATE_LIMIT_WINDOW_MS"),
                DEFAULT_RATE_LIMIT_WINDOW_MS,
            )?,
            max_requests: parse_number(
                "RATE_LIMIT_MAX_REQUESTS",
                get("RATE_LIMIT_MAX_REQUESTS"),
                DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            )?,
        };

        let config = Config {
            environment,
            server,
            database,
            cors,
            rate_limit,
            log_level,
        };
        config.validate()?;

        Ok(config)
    }
}

fn parse_number<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}

fn parse_enum<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    allowed: &'static str,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidEnum {
            key,
            value,
            allowed,
        }),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
