//! Entitlement resolver
//!
//! Loads the entitlement tree for a caller (demo template or the
//! organization's live quota document), performs the dot-path lookup, and
//! attaches the billing-period boundary and last-known remaining quota so
//! downstream stages never re-query.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::counter::{quota_key, CounterStore};
use crate::domain::entitlement::{
    period, Limit, ResolvedEntitlement, ResourceEntitlement, ResourcePath,
};
use crate::domain::gateway::CallerIdentity;
use crate::domain::GatewayError;

use super::plan_cache::PlanCache;
use super::store::SubscriptionStore;

#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    store: Arc<dyn SubscriptionStore>,
    plan_cache: PlanCache,
    counters: Arc<dyn CounterStore>,
    demo_template_name: String,
}

impl EntitlementResolver {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        plan_cache: PlanCache,
        counters: Arc<dyn CounterStore>,
        demo_template_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            plan_cache,
            counters,
            demo_template_name: demo_template_name.into(),
        }
    }

    /// Resolves the leaf entitlement for `resource`.
    ///
    /// A missing leaf is [`GatewayError::EntitlementNotFound`]; a leaf with
    /// `access=false` resolves successfully and is the caller's denial to
    /// report, so headers can still be built from it.
    pub async fn resolve(
        &self,
        identity: &CallerIdentity,
        resource: &ResourcePath,
    ) -> Result<ResolvedEntitlement, GatewayError> {
        let (tree, period_end) = match identity {
            CallerIdentity::Demo { .. } => {
                let tree = self
                    .store
                    .demo_template(&self.demo_template_name)
                    .await?
                    .ok_or_else(|| {
                        GatewayError::configuration(format!(
                            "Demo entitlement template '{}' is not provisioned",
                            self.demo_template_name
                        ))
                    })?;

                // Demo traffic has no subscription; its quota window tracks
                // the calendar month directly.
                (tree, period::next_month_start(Utc::now()))
            }
            CallerIdentity::Organization(organization_id) => {
                let plan_id = self.plan_cache.resolve_plan_id(organization_id).await?;

                let document = self
                    .store
                    .quota_document(organization_id)
                    .await?
                    .ok_or_else(|| {
                        GatewayError::no_subscription(format!(
                            "Organization '{}' has no quota document",
                            organization_id
                        ))
                    })?;

                if document.plan_id != plan_id {
                    warn!(
                        %organization_id,
                        cached = %plan_id,
                        live = %document.plan_id,
                        "Plan cache and quota document disagree"
                    );
                }

                (document.entitlements, document.period_end)
            }
        };

        let entitlement = tree
            .lookup(resource)
            .cloned()
            .ok_or_else(|| GatewayError::entitlement_not_found(resource.as_str()))?;

        let quota_remaining = self
            .current_quota_remaining(identity, resource, &entitlement)
            .await?;

        debug!(
            resource = %resource,
            identity = %identity.bucket_id(),
            ?quota_remaining,
            "Resolved entitlement"
        );

        Ok(ResolvedEntitlement {
            resource: resource.clone(),
            entitlement,
            period_end,
            quota_remaining,
        })
    }

    /// Reads the remaining quota counter, seeding it write-through from the
    /// entitlement ceiling the first time a (owner, resource) pair is seen.
    async fn current_quota_remaining(
        &self,
        identity: &CallerIdentity,
        resource: &ResourcePath,
        entitlement: &ResourceEntitlement,
    ) -> Result<Option<i64>, GatewayError> {
        let Limit::Finite(ceiling) = entitlement.quota else {
            return Ok(None);
        };

        let key = quota_key(identity.quota_owner(), resource.as_str());

        match self.counters.get(&key).await? {
            Some(remaining) => Ok(Some(remaining)),
            None => {
                let seeded = ceiling as i64;
                self.counters.set(&key, seeded).await?;
                Ok(Some(seeded))
            }
        }
    }
}
