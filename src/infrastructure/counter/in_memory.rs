//! In-memory counter store
//!
//! Substitute for the Redis adapter in tests and local development. Honors
//! expiries against a real clock and counts operations so tests can assert
//! that a code path never touched the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::counter::CounterStore;
use crate::domain::GatewayError;

#[derive(Debug)]
struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Thread-safe in-memory [`CounterStore`]
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
    error: Mutex<Option<String>>,
    operations: AtomicU64,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail, for failure-path tests.
    pub fn with_error(self, error: impl Into<String>) -> Self {
        *self.error.lock().unwrap() = Some(error.into());
        self
    }

    /// Pre-seeds a counter without counting as an operation.
    pub fn with_counter(self, key: &str, value: i64) -> Self {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        self
    }

    /// Number of store operations performed so far.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// Forces a key's expiry into the past, simulating window elapse.
    pub fn force_expire(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() - Duration::from_secs(1));
        }
    }

    fn check_error(&self) -> Result<(), GatewayError> {
        self.operations.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(GatewayError::storage(error));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, GatewayError> {
        self.check_error()?;
        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), GatewayError> {
        self.check_error()?;
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, GatewayError> {
        self.check_error()?;
        let mut entries = self.entries.lock().unwrap();

        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: None,
        });
        entry.value += delta;

        Ok(entry.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, GatewayError> {
        self.check_error()?;
        let mut entries = self.entries.lock().unwrap();

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
