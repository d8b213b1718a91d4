#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use astra_service::config::Config;
use astra_service::services::astra::{ClientOptions, DatabaseDriver, DatabaseSession};
use astra_service::services::database::{DatabaseError, DatabaseHealth, HealthProbe};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const TEST_KEYSPACE: &str = "test_keyspace";
pub const TEST_BUNDLE: &str = "/tmp/secure-connect-test.zip";

pub fn init_tracing_once() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("astra_service=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Minimal environment accepted by the configuration loader.
pub fn test_env() -> HashMap<String, String> {
    [
        ("NODE_ENV", "test"),
        ("PORT", "3002"),
        ("ASTRA_DB_ID", "test-db-id"),
        ("ASTRA_DB_REGION", "test-region"),
        ("ASTRA_DB_KEYSPACE", TEST_KEYSPACE),
        ("ASTRA_DB_CLIENT_ID", "test-client-id"),
        ("ASTRA_DB_CLIENT_SECRET", "test-client-secret"),
        ("LOG_LEVEL", "silent"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

pub fn config_from(env: &HashMap<String, String>) -> Config {
    Config::from_lookup(|key| env.get(key).cloned()).expect("Test configuration should be valid")
}

/// Test configuration with `overrides` applied on top of [`test_env`].
pub fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    let mut env = test_env();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    config_from(&env)
}

pub fn test_config() -> Config {
    test_config_with(&[])
}

/// A health probe returning a canned result.
pub struct MockProbe {
    result: Result<DatabaseHealth, ()>,
}

impl MockProbe {
    pub fn connected() -> Arc<Self> {
        Arc::new(Self {
            result: Ok(DatabaseHealth::healthy(TEST_KEYSPACE)),
        })
    }

    pub fn disconnected() -> Arc<Self> {
        Arc::new(Self {
            result: Ok(DatabaseHealth::unhealthy("Database not connected")),
        })
    }

    /// A probe that fails to run at all.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { result: Err(()) })
    }
}

#[async_trait]
impl HealthProbe for MockProbe {
    async fn probe(&self) -> Result<DatabaseHealth, DatabaseError> {
        self.result.clone().map_err(|_| DatabaseError::Closed)
    }
}

/// An in-memory session recording executed statements.
#[derive(Default)]
pub struct MockSession {
    pub fail_queries: AtomicBool,
    pub shut_down: AtomicBool,
    pub shutdown_delay: Mutex<Option<Duration>>,
    executed: Mutex<Vec<String>>,
}

impl MockSession {
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseSession for MockSession {
    async fn execute(&self, cql: &str) -> Result<Value, DatabaseError> {
        self.executed.lock().unwrap().push(cql.to_string());
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DatabaseError::Rejected {
                status: 503,
                body: "connection reset".to_string(),
            });
        }
        Ok(json!({ "count": 1, "data": [] }))
    }

    async fn shutdown(&self) -> Result<(), DatabaseError> {
        let delay = *self.shutdown_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A driver handing out one shared [`MockSession`], or failing every connect.
pub struct MockDriver {
    pub session: Arc<MockSession>,
    pub fail: bool,
    pub panic: bool,
    pub connects: AtomicUsize,
    pub last_options: Mutex<Option<ClientOptions>>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(MockSession::default()),
            fail: false,
            panic: false,
            connects: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(MockSession::default()),
            fail: true,
            panic: false,
            connects: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    /// A driver whose `connect` panics.
    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(MockSession::default()),
            fail: false,
            panic: true,
            connects: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    async fn connect(
        &self,
        options: &ClientOptions,
    ) -> Result<Arc<dyn DatabaseSession>, DatabaseError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        if self.panic {
            panic!("driver exploded while connecting");
        }
        if self.fail {
            return Err(DatabaseError::Rejected {
                status: 401,
                body: "invalid credentials".to_string(),
            });
        }
        Ok(self.session.clone())
    }
}

/// Spawns the application and returns its address.
///
/// Returned address format: `http://127.0.0.1:8492`
pub async fn spawn_app(config: Config, probe: Arc<dyn HealthProbe>) -> String {
    init_tracing_once();

    // Randomly choose an available port
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port at localhost");
    let port = listener.local_addr().unwrap().port();

    let app = astra_service::app(Arc::new(config), probe);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://127.0.0.1:{port}")
}

/// Polls `condition` every 10ms for up to one second.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// One event recorded by [`CapturedEvents`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// A layer recording every event it sees, for assertions on log output.
///
/// Install it with `tracing_subscriber::registry().with(events.clone()).set_default()`
/// on a current-thread runtime so spawned server tasks report to it.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedEvents {
    /// Events emitted by the request logger.
    pub fn requests(&self) -> Vec<CapturedEvent> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.target.ends_with("request_logger"))
            .cloned()
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}
