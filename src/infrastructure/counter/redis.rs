//! Redis counter store adapter

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::time::timeout;

use crate::domain::counter::CounterStore;
use crate::domain::GatewayError;

/// Configuration for the Redis counter store
#[derive(Debug, Clone)]
pub struct RedisCounterConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Per-operation timeout; a slow store surfaces as a transport failure
    /// rather than stalling every gated request indefinitely.
    pub op_timeout: Duration,
}

impl Default for RedisCounterConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            op_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisCounterConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }
}

/// Redis-backed [`CounterStore`]
///
/// INCR/INCRBY provide the atomic increment the enforcer depends on;
/// EXPIRE bounds the RPM windows.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    config: RedisCounterConfig,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCounterStore {
    /// Connects to Redis and returns the adapter.
    pub async fn connect(config: RedisCounterConfig) -> Result<Self, GatewayError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| GatewayError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = timeout(config.op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| GatewayError::storage("Timed out connecting to Redis"))?
            .map_err(|e| GatewayError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn time_boxed<T>(
        &self,
        op: &str,
        fut: impl std::future::Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, GatewayError> {
        timeout(self.config.op_timeout, fut)
            .await
            .map_err(|_| GatewayError::storage(format!("Redis {} timed out", op)))?
            .map_err(|e| GatewayError::storage(format!("Redis {} failed: {}", op, e)))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, GatewayError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        self.time_boxed("GET", conn.get(&prefixed_key)).await
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), GatewayError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        self.time_boxed::<()>("SET", conn.set(&prefixed_key, value))
            .await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, GatewayError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        self.time_boxed("INCRBY", conn.incr(&prefixed_key, delta))
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, GatewayError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs = ttl.as_secs().max(1) as i64;

        self.time_boxed("EXPIRE", conn.expire(&prefixed_key, ttl_secs))
            .await
    }

    async fn close(&self) -> Result<(), GatewayError> {
        // ConnectionManager reconnects lazily and has no explicit teardown;
        // dropping the last clone releases the connection.
        Ok(())
    }
}
