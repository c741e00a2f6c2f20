//! Counter store abstraction
//!
//! Quota remainders and RPM windows live in an external atomic key-value
//! store shared across all gateway instances. Correctness of enforcement
//! depends entirely on the store's atomic increment primitive; the gateway
//! holds no in-process locks.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::GatewayError;

/// Atomic counter store consumed by the limit enforcer
///
/// Implementations must provide millisecond-level consistency across
/// concurrent callers; `increment` in particular must be atomic.
#[async_trait]
pub trait CounterStore: Send + Sync + Debug {
    /// Reads a counter, `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<i64>, GatewayError>;

    /// Writes a counter unconditionally.
    async fn set(&self, key: &str, value: i64) -> Result<(), GatewayError>;

    /// Atomically adds `delta` and returns the new value. A missing key is
    /// created at zero before the addition.
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, GatewayError>;

    /// Sets a time-to-live on an existing key. Returns `false` when the key
    /// does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, GatewayError>;

    /// Releases the underlying connection. Default is a no-op for stores
    /// without an explicit lifecycle.
    async fn close(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Key for an organization's remaining monthly quota on one resource.
pub fn quota_key(organization_id: &str, resource: &str) -> String {
    format!("quota:{}:{}", organization_id, resource)
}

/// Key for the 60-second RPM window of one identity on one resource.
/// Identity is an organization id for keyed traffic and an IP for demo.
pub fn rpm_key(resource: &str, identity: &str) -> String {
    format!("rpm:{}:{}", resource, identity)
}
