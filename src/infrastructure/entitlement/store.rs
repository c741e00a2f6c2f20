//! Subscription store seam and in-memory implementation

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::entitlement::{EntitlementTree, OrganizationId, PlanId, QuotaDocument};
use crate::domain::GatewayError;

/// Persistent entitlement/subscription store keyed by organization
///
/// The gateway consumes this read-only; authoring plans and billing live
/// elsewhere.
#[async_trait]
pub trait SubscriptionStore: Send + Sync + Debug {
    /// Plan referenced by the organization's active subscription, if any.
    async fn active_plan(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<PlanId>, GatewayError>;

    /// The organization's live quota document.
    async fn quota_document(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<QuotaDocument>, GatewayError>;

    /// Static, named entitlement template for demo traffic. Not tied to any
    /// organization.
    async fn demo_template(&self, name: &str) -> Result<Option<EntitlementTree>, GatewayError>;
}

/// In-memory [`SubscriptionStore`] for tests and local development
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    plans: HashMap<OrganizationId, PlanId>,
    quota_documents: HashMap<OrganizationId, QuotaDocument>,
    demo_templates: HashMap<String, EntitlementTree>,
    error: Mutex<Option<String>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(mut self, organization_id: OrganizationId, plan_id: PlanId) -> Self {
        self.plans.insert(organization_id, plan_id);
        self
    }

    pub fn with_quota_document(mut self, document: QuotaDocument) -> Self {
        self.quota_documents
            .insert(document.organization_id.clone(), document);
        self
    }

    pub fn with_demo_template(mut self, name: impl Into<String>, tree: EntitlementTree) -> Self {
        self.demo_templates.insert(name.into(), tree);
        self
    }

    /// Makes every subsequent lookup fail, for failure-path tests.
    pub fn with_error(self, error: impl Into<String>) -> Self {
        *self.error.lock().unwrap() = Some(error.into());
        self
    }

    fn check_error(&self) -> Result<(), GatewayError> {
        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(GatewayError::storage(error));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn active_plan(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<PlanId>, GatewayError> {
        self.check_error()?;
        Ok(self.plans.get(organization_id).cloned())
    }

    async fn quota_document(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<QuotaDocument>, GatewayError> {
        self.check_error()?;
        Ok(self.quota_documents.get(organization_id).cloned())
    }

    async fn demo_template(&self, name: &str) -> Result<Option<EntitlementTree>, GatewayError> {
        self.check_error()?;
        Ok(self.demo_templates.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::{Limit, ResourceEntitlement};
    use chrono::Utc;

    #[tokio::test]
    async fn test_lookups() {
        let org = OrganizationId::new("org-1");
        let store = InMemorySubscriptionStore::new()
            .with_subscription(org.clone(), PlanId::new("plan-pro"))
            .with_quota_document(QuotaDocument {
                organization_id: org.clone(),
                plan_id: PlanId::new("plan-pro"),
                entitlements: EntitlementTree::new().with(
                    "search.text",
                    ResourceEntitlement::new(true, Limit::Finite(100), Limit::Finite(60)),
                ),
                period_end: Utc::now(),
            })
            .with_demo_template("default", EntitlementTree::new());

        assert_eq!(
            store.active_plan(&org).await.unwrap(),
            Some(PlanId::new("plan-pro"))
        );
        assert!(store.quota_document(&org).await.unwrap().is_some());
        assert!(store.demo_template("default").await.unwrap().is_some());
        assert!(store.demo_template("other").await.unwrap().is_none());

        let unknown = OrganizationId::new("org-x");
        assert!(store.active_plan(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_error() {
        let store = InMemorySubscriptionStore::new().with_error("store down");
        let err = store
            .active_plan(&OrganizationId::new("org-1"))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 500);
    }
}
