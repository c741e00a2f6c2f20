//! Admission-control gateway
//!
//! Sits in front of protected API handlers and decides, per request, whether
//! the call may proceed based on:
//! - credential kind and authenticity (demo / public / private keys),
//! - subscription entitlements (per-organization plan),
//! - a rolling monthly quota, and
//! - a per-minute rate limit,
//!
//! scoped independently per dot-separated resource path. Limits are enforced
//! against a shared atomic counter store, and every response carries
//! machine-readable rate-limit headers.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use api::{AppState, GatedRoutes};
use domain::counter::CounterStore;
use domain::entitlement::{EntitlementTree, Limit, ResourceEntitlement};
use infrastructure::counter::{RedisCounterConfig, RedisCounterStore};
use infrastructure::credential::{
    CredentialResolver, HmacPayloadCipher, PrefixKeyAuthenticator,
};
use infrastructure::entitlement::{
    EntitlementResolver, InMemorySubscriptionStore, PlanCache, SubscriptionStore,
};
use infrastructure::gateway::{AdmissionGateway, LimitEnforcer};

/// Create the application state with all services initialized
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    info!("Connecting to counter store at {}", config.counter_store.url);

    let mut counter_config = RedisCounterConfig::new(&config.counter_store.url)
        .with_op_timeout(Duration::from_millis(config.counter_store.op_timeout_ms));

    if let Some(prefix) = &config.counter_store.key_prefix {
        counter_config = counter_config.with_key_prefix(prefix);
    }

    let counters: Arc<dyn CounterStore> =
        Arc::new(RedisCounterStore::connect(counter_config).await?);

    info!("Counter store connection established");

    // Subscriptions are served from the in-memory store until a persistent
    // backend is wired in; demo traffic is fully functional out of the box.
    let store: Arc<dyn SubscriptionStore> = Arc::new(
        InMemorySubscriptionStore::new()
            .with_demo_template(&config.gateway.demo_template, default_demo_template()),
    );

    let plan_cache = PlanCache::new(store.clone(), config.gateway.plan_cache_capacity);

    let entitlements = EntitlementResolver::new(
        store,
        plan_cache,
        counters.clone(),
        &config.gateway.demo_template,
    );

    let credentials = CredentialResolver::new(
        &config.gateway.demo_key,
        Arc::new(HmacPayloadCipher::new(&config.gateway.cipher_secret)),
        Arc::new(PrefixKeyAuthenticator::default()),
    );

    let enforcer = LimitEnforcer::new(counters.clone());
    let gateway = AdmissionGateway::new(credentials, entitlements, enforcer);

    Ok(AppState::new(
        Arc::new(gateway),
        counters,
        GatedRoutes::new()?,
    ))
}

/// Entitlements granted to demo traffic: tight ceilings per caller IP
fn default_demo_template() -> EntitlementTree {
    EntitlementTree::new().with(
        "search.text",
        ResourceEntitlement::new(true, Limit::Finite(50), Limit::Finite(5)),
    )
}
