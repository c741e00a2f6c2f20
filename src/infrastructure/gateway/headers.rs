//! Rate-limit response headers
//!
//! Every response, success or failure, carries machine-readable rate-limit
//! metadata; clients never receive a response with zero rate-limit context.

use chrono::Utc;

use crate::domain::entitlement::{Limit, ResolvedEntitlement, ResourcePath};

pub const RESOURCE: &str = "X-RateLimit-Resource";
pub const QUOTA_LIMIT: &str = "X-RateLimit-Quota-Limit";
pub const QUOTA_REMAINING: &str = "X-RateLimit-Quota-Remaining";
pub const QUOTA_RESET: &str = "X-RateLimit-Quota-Reset";
pub const RPM_LIMIT: &str = "X-RateLimit-RPM-Limit";
pub const RPM_REMAINING: &str = "X-RateLimit-RPM-Remaining";
pub const RPM_RESET: &str = "X-RateLimit-RPM-Reset";
pub const RETRY_AFTER: &str = "Retry-After";

/// Sentinel rendered for unbounded ceilings, so clients can distinguish
/// "quota is infinite" from "no quota configured".
pub const UNLIMITED: &str = "unlimited";

/// Ordered rate-limit header set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    entries: Vec<(&'static str, String)>,
}

impl RateLimitHeaders {
    /// Minimal header set when only the resource is known (entitlement
    /// resolution never completed).
    pub fn resource_only(resource: &ResourcePath) -> Self {
        let mut headers = Self::default();
        headers.push(RESOURCE, resource.as_str());
        headers
    }

    /// Full header set for a resolved entitlement.
    ///
    /// `entitlement.quota_remaining` is rendered as-is but floored at zero;
    /// `rpm_used` of `None` means enforcement never ran (remaining is the
    /// full ceiling). The RPM reset is approximated as now + 60 rather than
    /// aligned to the live window's TTL.
    pub fn for_entitlement(entitlement: &ResolvedEntitlement, rpm_used: Option<u64>) -> Self {
        let mut headers = Self::resource_only(&entitlement.resource);

        match entitlement.entitlement.quota {
            Limit::Finite(limit) => {
                let remaining = entitlement.quota_remaining.unwrap_or(0).max(0);
                headers.push(QUOTA_LIMIT, limit.to_string());
                headers.push(QUOTA_REMAINING, remaining.to_string());
                headers.push(QUOTA_RESET, entitlement.period_end.timestamp().to_string());
            }
            Limit::Unlimited => {
                headers.push(QUOTA_LIMIT, UNLIMITED);
                headers.push(QUOTA_REMAINING, UNLIMITED);
            }
        }

        if let Limit::Finite(limit) = entitlement.entitlement.rpm {
            let remaining = limit.saturating_sub(rpm_used.unwrap_or(0));
            headers.push(RPM_LIMIT, limit.to_string());
            headers.push(RPM_REMAINING, remaining.to_string());
            headers.push(
                RPM_RESET,
                (Utc::now().timestamp() as u64 + 60).to_string(),
            );
        }

        headers
    }

    /// Merges the `Retry-After` header in, on 429 outcomes only.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.push(RETRY_AFTER, seconds.to_string());
        self
    }

    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.entries.push((name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
