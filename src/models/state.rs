use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::services::database::HealthProbe;
use crate::utils::constant::RATE_LIMIT_CACHE_CAPACITY;

/// Application state shared across requests. Needs to be thread-safe.
pub struct AppState {
    /// The validated, immutable service configuration.
    pub config: Arc<Config>,
    /// Health source for the datastore, normally the [`crate::services::database::Database`].
    pub database: Arc<dyn HealthProbe>,
    /// Per-client request counters.
    pub rate_limiter: RateLimiter,
    /// When the state was created; used to report uptime.
    pub started_at: Instant,
    /// Full paths of the monitoring endpoints, which are not request-logged.
    quiet_paths: [String; 2],
}

impl AppState {
    /// Creates a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated service configuration
    /// * `database` - Health source used by the health endpoint
    pub fn new(config: Arc<Config>, database: Arc<dyn HealthProbe>) -> Self {
        info!("Initializing application state");
        debug!(
            window_ms = config.rate_limit.window_ms,
            max_requests = config.rate_limit.max_requests,
            "Creating rate limiter"
        );

        let prefix = config.server.normalized_prefix();
        let quiet_paths = [format!("{prefix}/health"), format!("{prefix}/status")];

        Self {
            rate_limiter: RateLimiter::new(
                config.rate_limit.window(),
                config.rate_limit.max_requests,
            ),
            database,
            started_at: Instant::now(),
            quiet_paths,
            config,
        }
    }

    /// Seconds since the state was created.
    #[inline]
    pub fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Whether requests to `path` are excluded from request logging.
    pub fn is_quiet_path(&self, path: &str) -> bool {
        self.quiet_paths.iter().any(|quiet| quiet == path)
    }

    /// Removes expired rate limit windows.
    ///
    /// Called periodically to bound memory use. Only performs cleanup when
    /// the number of tracked clients exceeds the configured capacity.
    #[instrument(skip_all)]
    pub fn cleanup_expired_entries(&self) {
        let tracked = self.rate_limiter.len();

        debug!(
            tracked,
            capacity = RATE_LIMIT_CACHE_CAPACITY,
            "Checking if rate limit cleanup is needed"
        );

        if tracked > RATE_LIMIT_CACHE_CAPACITY {
            let removed = self.rate_limiter.purge_expired();
            info!(
                initial_size = tracked,
                removed, "Cleaned up expired rate limit entries"
            );
        }
    }
}
