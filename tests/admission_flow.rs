//! End-to-end admission tests running the full orchestrator against the
//! in-memory counter and subscription stores.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use admission_gateway::domain::counter::CounterStore;
use admission_gateway::domain::credential::CredentialKind;
use admission_gateway::domain::entitlement::{
    EntitlementTree, Limit, OrganizationId, PlanId, QuotaDocument, ResourceEntitlement,
    ResourcePath,
};
use admission_gateway::domain::gateway::{RequestMeta, RouteSpec};
use admission_gateway::infrastructure::counter::InMemoryCounterStore;
use admission_gateway::infrastructure::credential::{
    CredentialResolver, HmacPayloadCipher, PrefixKeyAuthenticator,
};
use admission_gateway::infrastructure::entitlement::{
    EntitlementResolver, InMemorySubscriptionStore, PlanCache,
};
use admission_gateway::infrastructure::gateway::{
    headers, AdmissionGateway, GatewayReply, HandlerReply, LimitEnforcer,
};

const DEMO_KEY: &str = "demo-shared-0000";
const CIPHER_SECRET: &str = "integration-secret";

struct Harness {
    gateway: AdmissionGateway,
    counters: Arc<InMemoryCounterStore>,
    cipher: HmacPayloadCipher,
}

fn org() -> OrganizationId {
    OrganizationId::new("org-1")
}

fn entitlements() -> EntitlementTree {
    EntitlementTree::new()
        .with(
            "search.text",
            ResourceEntitlement::new(true, Limit::Finite(100), Limit::Finite(60)),
        )
        .with(
            "search.image",
            ResourceEntitlement::new(false, Limit::Finite(10), Limit::Finite(5)),
        )
        .with(
            "quota.small",
            ResourceEntitlement::new(true, Limit::Finite(3), Limit::Unlimited),
        )
        .with(
            "rpm.small",
            ResourceEntitlement::new(true, Limit::Unlimited, Limit::Finite(2)),
        )
        .with(
            "burst",
            ResourceEntitlement::new(true, Limit::Unlimited, Limit::Finite(10)),
        )
        .with(
            "reports.daily",
            ResourceEntitlement::new(true, Limit::Finite(10), Limit::Finite(1)),
        )
}

fn harness() -> Harness {
    let counters = Arc::new(InMemoryCounterStore::new());
    let cipher = HmacPayloadCipher::new(CIPHER_SECRET);

    let store = Arc::new(
        InMemorySubscriptionStore::new()
            .with_subscription(org(), PlanId::new("plan-pro"))
            .with_quota_document(QuotaDocument {
                organization_id: org(),
                plan_id: PlanId::new("plan-pro"),
                entitlements: entitlements(),
                period_end: Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap(),
            })
            .with_demo_template(
                "default",
                EntitlementTree::new().with(
                    "search.text",
                    ResourceEntitlement::new(true, Limit::Finite(5), Limit::Finite(2)),
                ),
            ),
    );

    let plan_cache = PlanCache::new(store.clone(), 1_000);
    let entitlement_resolver =
        EntitlementResolver::new(store, plan_cache, counters.clone(), "default");

    let credentials = CredentialResolver::new(
        DEMO_KEY,
        Arc::new(cipher.clone()),
        Arc::new(PrefixKeyAuthenticator::default()),
    );

    let gateway = AdmissionGateway::new(
        credentials,
        entitlement_resolver,
        LimitEnforcer::new(counters.clone()),
    );

    Harness {
        gateway,
        counters,
        cipher,
    }
}

fn route(resource: &str, kind: CredentialKind, supports_demo: bool) -> RouteSpec {
    RouteSpec::new(ResourcePath::new(resource).unwrap(), kind, supports_demo).unwrap()
}

fn keyed_meta(harness: &Harness) -> RequestMeta {
    let bearer = format!(
        "pk-live-{}",
        harness.cipher.seal(r#"{"organization_id":"org-1"}"#, None)
    );

    RequestMeta {
        bearer: Some(bearer),
        forwarded_for: Some("203.0.113.9".to_string()),
        real_ip: None,
    }
}

fn demo_meta() -> RequestMeta {
    RequestMeta {
        bearer: Some(DEMO_KEY.to_string()),
        forwarded_for: Some("203.0.113.42".to_string()),
        real_ip: None,
    }
}

async fn invoke(harness: &Harness, route: &RouteSpec, meta: &RequestMeta) -> GatewayReply {
    harness
        .gateway
        .invoke(route, meta, |_context| async move {
            Ok(HandlerReply::data(json!({"ok": true})))
        })
        .await
}

fn failure_message(reply: &GatewayReply) -> String {
    match reply {
        GatewayReply::Failure { error, .. } => error.clone(),
        GatewayReply::Success { .. } => panic!("expected a failure reply"),
    }
}

#[tokio::test]
async fn test_admitted_request_reaches_handler_with_headers() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);

    let reply = invoke(&harness, &route, &keyed_meta(&harness)).await;

    assert!(reply.is_success());
    assert_eq!(reply.status(), 200);
    assert_eq!(reply.headers().get(headers::RESOURCE), Some("search.text"));
    assert_eq!(reply.headers().get(headers::QUOTA_LIMIT), Some("100"));
    assert_eq!(reply.headers().get(headers::QUOTA_REMAINING), Some("99"));
    assert_eq!(reply.headers().get(headers::RPM_LIMIT), Some("60"));
    assert_eq!(reply.headers().get(headers::RPM_REMAINING), Some("59"));
}

#[tokio::test]
async fn test_missing_leaf_and_denied_leaf_are_distinct_forbidden() {
    let harness = harness();

    let missing = route("search.voice", CredentialKind::Public, true);
    let reply = invoke(&harness, &missing, &keyed_meta(&harness)).await;
    assert_eq!(reply.status(), 403);
    let missing_message = failure_message(&reply);

    let denied = route("search.image", CredentialKind::Public, true);
    let reply = invoke(&harness, &denied, &keyed_meta(&harness)).await;
    assert_eq!(reply.status(), 403);
    let denied_message = failure_message(&reply);

    assert_ne!(missing_message, denied_message);
    // The denied leaf resolved, so its reply carries full entitlement headers
    assert_eq!(reply.headers().get(headers::QUOTA_LIMIT), Some("10"));
}

#[tokio::test]
async fn test_finite_quota_admits_exactly_q_requests() {
    let harness = harness();
    let route = route("quota.small", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    for expected_remaining in (0..3).rev() {
        let reply = invoke(&harness, &route, &meta).await;
        assert!(reply.is_success());
        assert_eq!(
            reply.headers().get(headers::QUOTA_REMAINING),
            Some(expected_remaining.to_string().as_str())
        );
    }

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 429);
    assert!(failure_message(&reply).contains("quota.small"));
    assert!(reply.headers().get(headers::RETRY_AFTER).is_some());
    assert_eq!(reply.headers().get(headers::QUOTA_REMAINING), Some("0"));
}

#[tokio::test]
async fn test_exhausted_quota_names_resource_and_next_month() {
    let harness = harness();
    harness
        .counters
        .set("quota:org-1:search.text", 0)
        .await
        .unwrap();

    let route = route("search.text", CredentialKind::Public, true);
    let reply = invoke(&harness, &route, &keyed_meta(&harness)).await;

    assert_eq!(reply.status(), 429);
    assert!(failure_message(&reply).contains("search.text"));

    let retry_after: u64 = reply
        .headers()
        .get(headers::RETRY_AFTER)
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);
    assert!(retry_after <= 31 * 24 * 3600);
}

#[tokio::test]
async fn test_rpm_ceiling_rejects_with_sixty_second_retry() {
    let harness = harness();
    let route = route("rpm.small", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    for _ in 0..2 {
        assert!(invoke(&harness, &route, &meta).await.is_success());
    }

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 429);
    assert_eq!(reply.headers().get(headers::RETRY_AFTER), Some("60"));
    assert_eq!(reply.headers().get(headers::RPM_REMAINING), Some("0"));

    // A fresh window admits again
    harness.counters.force_expire("rpm:rpm.small:org-1");
    assert!(invoke(&harness, &route, &meta).await.is_success());
}

#[tokio::test]
async fn test_rpm_rejection_headers_count_the_spent_quota_unit() {
    let harness = harness();
    let route = route("reports.daily", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    let reply = invoke(&harness, &route, &meta).await;
    assert!(reply.is_success());
    assert_eq!(reply.headers().get(headers::QUOTA_REMAINING), Some("9"));

    // The rejected request spent its quota unit before the RPM ceiling
    // fired; the headers report the live counter, not the resolve-time value
    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 429);
    assert_eq!(reply.headers().get(headers::RPM_REMAINING), Some("0"));
    assert_eq!(reply.headers().get(headers::QUOTA_REMAINING), Some("8"));
    assert_eq!(
        harness
            .counters
            .get("quota:org-1:reports.daily")
            .await
            .unwrap(),
        Some(8)
    );
}

#[tokio::test]
async fn test_unlimited_quota_with_finite_rpm() {
    let harness = harness();
    let route = route("burst", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    for _ in 0..10 {
        let reply = invoke(&harness, &route, &meta).await;
        assert!(reply.is_success());
        assert_eq!(reply.headers().get(headers::QUOTA_LIMIT), Some("unlimited"));
        assert_eq!(
            reply.headers().get(headers::QUOTA_REMAINING),
            Some("unlimited")
        );
    }

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 429);
    assert_eq!(reply.headers().get(headers::RETRY_AFTER), Some("60"));
}

#[tokio::test]
async fn test_demo_bearer_on_private_route_is_rejected_before_stores() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Private, true);

    let reply = invoke(&harness, &route, &demo_meta()).await;

    assert_eq!(reply.status(), 400);
    assert_eq!(harness.counters.operation_count(), 0);
}

#[tokio::test]
async fn test_demo_bearer_on_unsupported_route_is_rejected_before_stores() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, false);

    let reply = invoke(&harness, &route, &demo_meta()).await;

    assert_eq!(reply.status(), 400);
    assert_eq!(harness.counters.operation_count(), 0);
}

#[tokio::test]
async fn test_demo_traffic_uses_template_ceilings() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = demo_meta();

    let reply = invoke(&harness, &route, &meta).await;
    assert!(reply.is_success());
    assert_eq!(reply.headers().get(headers::QUOTA_LIMIT), Some("5"));
    assert_eq!(reply.headers().get(headers::RPM_LIMIT), Some("2"));

    // Demo RPM buckets by caller IP
    assert_eq!(
        harness
            .counters
            .get("rpm:search.text:203.0.113.42")
            .await
            .unwrap(),
        Some(1)
    );
}

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = RequestMeta {
        bearer: None,
        forwarded_for: Some("203.0.113.9".to_string()),
        real_ip: None,
    };

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 401);
    assert_eq!(reply.headers().get(headers::RESOURCE), Some("search.text"));
}

#[tokio::test]
async fn test_undeterminable_ip_is_bad_request() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = RequestMeta {
        bearer: Some(DEMO_KEY.to_string()),
        forwarded_for: None,
        real_ip: None,
    };

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 400);
}

#[tokio::test]
async fn test_re_resolution_reflects_consumed_quota() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    invoke(&harness, &route, &meta).await;
    invoke(&harness, &route, &meta).await;

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.headers().get(headers::QUOTA_REMAINING), Some("97"));
}

#[tokio::test]
async fn test_handler_failure_is_generic_internal_error() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    let reply = harness
        .gateway
        .invoke(&route, &meta, |_context| async move {
            Err(anyhow::anyhow!("backend exploded with connection string"))
        })
        .await;

    assert_eq!(reply.status(), 500);
    let message = failure_message(&reply);
    assert_eq!(message, "Internal server error");
    assert!(!message.contains("connection string"));
    // The admission was already charged before the handler ran
    assert_eq!(
        harness
            .counters
            .get("quota:org-1:search.text")
            .await
            .unwrap(),
        Some(99)
    );
}

#[tokio::test]
async fn test_handler_error_reply_passes_through() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = keyed_meta(&harness);

    let reply = harness
        .gateway
        .invoke(&route, &meta, |_context| async move {
            Ok(HandlerReply::error_with_status(422, "Unprocessable thing"))
        })
        .await;

    assert_eq!(reply.status(), 422);
    assert_eq!(failure_message(&reply), "Unprocessable thing");
    // Handler-level failures still carry the rate-limit headers
    assert_eq!(reply.headers().get(headers::QUOTA_REMAINING), Some("99"));
}

#[tokio::test]
async fn test_tampered_key_is_unauthorized() {
    let harness = harness();
    let route = route("search.text", CredentialKind::Public, true);
    let meta = RequestMeta {
        bearer: Some("pk-live-AAAA.0123456789abcdef".to_string()),
        forwarded_for: Some("203.0.113.9".to_string()),
        real_ip: None,
    };

    let reply = invoke(&harness, &route, &meta).await;
    assert_eq!(reply.status(), 401);
}
