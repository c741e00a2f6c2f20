//! Limit enforcer
//!
//! Consumes one unit of quota and one unit of RPM budget against the shared
//! counter store. Quota and RPM are independent dimensions sharing nothing
//! but the resource path; the first failing dimension short-circuits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::domain::counter::{quota_key, rpm_key, CounterStore};
use crate::domain::entitlement::{period, Limit, ResolvedEntitlement};
use crate::domain::gateway::{CallerIdentity, EnforcementResult, RateLimitRejection};
use crate::domain::GatewayError;

/// Length of the fixed RPM window.
pub const RPM_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LimitEnforcer {
    counters: Arc<dyn CounterStore>,
}

impl LimitEnforcer {
    pub fn new(counters: Arc<dyn CounterStore>) -> Self {
        Self { counters }
    }

    /// Atomically consumes quota and RPM budget for one request.
    ///
    /// Rejections are returned as data; `Err` is reserved for store
    /// transport failures, which the orchestrator downgrades to 500.
    ///
    /// Two bounded races are accepted by design and caught, not prevented:
    /// the quota pre-check and decrement are separate round-trips, so
    /// concurrent requests can drive the counter at most (concurrency - 1)
    /// below zero before the post-decrement guard fires; and the RPM
    /// increment happens before the ceiling check, so the request that tips
    /// the window over is still charged its unit.
    pub async fn enforce(
        &self,
        identity: &CallerIdentity,
        resolved: &ResolvedEntitlement,
    ) -> Result<EnforcementResult, GatewayError> {
        let quota_remaining = match self.consume_quota(identity, resolved).await? {
            Ok(remaining) => remaining,
            Err(rejection) => return Ok(EnforcementResult::Rejected(rejection)),
        };

        let rpm_used = match self.consume_rpm(identity, resolved).await? {
            Ok(used) => used,
            Err(mut rejection) => {
                // The quota unit consumed above stays spent; report the
                // counter as it now stands.
                rejection.quota_remaining = quota_remaining;
                return Ok(EnforcementResult::Rejected(rejection));
            }
        };

        Ok(EnforcementResult::Admitted {
            rpm_used,
            quota_remaining,
        })
    }

    async fn consume_quota(
        &self,
        identity: &CallerIdentity,
        resolved: &ResolvedEntitlement,
    ) -> Result<Result<Option<i64>, RateLimitRejection>, GatewayError> {
        if !resolved.entitlement.quota.is_finite() {
            return Ok(Ok(None));
        }

        let resource = resolved.resource.as_str();

        // The resolver seeds the counter for finite quotas; an absent value
        // means the quota record could not be established.
        let Some(last_known) = resolved.quota_remaining else {
            return Ok(Err(RateLimitRejection {
                error: GatewayError::no_subscription(format!(
                    "No quota record for resource '{}'",
                    resource
                )),
                rpm_used: 0,
                quota_remaining: None,
            }));
        };

        if last_known <= 0 {
            return Ok(Err(Self::quota_exhausted(resource, Some(last_known))));
        }

        let key = quota_key(identity.quota_owner(), resource);
        let remaining = self.counters.increment(&key, -1).await?;

        if remaining < 0 {
            // Belated catch for the check-then-act race; the primary guard
            // is the pre-check above.
            debug!(resource, remaining, "Quota overshoot detected post-decrement");
            return Ok(Err(Self::quota_exhausted(resource, Some(remaining))));
        }

        Ok(Ok(Some(remaining)))
    }

    async fn consume_rpm(
        &self,
        identity: &CallerIdentity,
        resolved: &ResolvedEntitlement,
    ) -> Result<Result<u64, RateLimitRejection>, GatewayError> {
        let Limit::Finite(ceiling) = resolved.entitlement.rpm else {
            return Ok(Ok(0));
        };

        let resource = resolved.resource.as_str();
        let key = rpm_key(resource, &identity.bucket_id());

        let count = self.counters.increment(&key, 1).await?;

        if count == 1 {
            // First increment opens the window.
            self.counters.expire(&key, RPM_WINDOW).await?;
        }

        let used = count.max(0) as u64;

        if used > ceiling {
            // The tipping increment is not rolled back; the denied request
            // still spends its slot.
            return Ok(Err(RateLimitRejection {
                error: GatewayError::rate_limited(
                    format!("Rate limit exceeded for resource '{}'", resource),
                    RPM_WINDOW.as_secs(),
                ),
                rpm_used: used,
                quota_remaining: None,
            }));
        }

        Ok(Ok(used))
    }

    fn quota_exhausted(resource: &str, quota_remaining: Option<i64>) -> RateLimitRejection {
        RateLimitRejection {
            error: GatewayError::rate_limited(
                format!("Monthly quota exhausted for resource '{}'", resource),
                period::seconds_until_next_month(Utc::now()),
            ),
            rpm_used: 0,
            quota_remaining,
        }
    }
}
