//! Plan cache
//!
//! Maps organization id to active plan id, avoiding a subscription-store hit
//! on every gated request. Entries have no TTL; plan changes are expected to
//! invalidate out-of-band.

use std::fmt;
use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::entitlement::{OrganizationId, PlanId};
use crate::domain::GatewayError;

use super::store::SubscriptionStore;

#[derive(Clone)]
pub struct PlanCache {
    cache: MokaCache<OrganizationId, PlanId>,
    store: Arc<dyn SubscriptionStore>,
}

impl fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl PlanCache {
    pub fn new(store: Arc<dyn SubscriptionStore>, max_capacity: u64) -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(max_capacity).build(),
            store,
        }
    }

    /// Resolves the organization's active plan id, cache first, populating
    /// the cache write-through on a store hit.
    pub async fn resolve_plan_id(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<PlanId, GatewayError> {
        if let Some(plan_id) = self.cache.get(organization_id).await {
            return Ok(plan_id);
        }

        let plan_id = self
            .store
            .active_plan(organization_id)
            .await?
            .ok_or_else(|| {
                GatewayError::no_subscription(format!(
                    "Organization '{}' has no active subscription",
                    organization_id
                ))
            })?;

        debug!(%organization_id, %plan_id, "Plan cache miss, populated from store");

        self.cache
            .insert(organization_id.clone(), plan_id.clone())
            .await;

        Ok(plan_id)
    }

    /// Drops a cached entry, for out-of-band invalidation hooks.
    pub async fn invalidate(&self, organization_id: &OrganizationId) {
        self.cache.invalidate(organization_id).await;
    }
}
