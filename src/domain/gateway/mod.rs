//! Gateway domain - route contracts, caller identity and enforcement results

use std::net::IpAddr;

use crate::domain::credential::CredentialKind;
use crate::domain::entitlement::{OrganizationId, ResolvedEntitlement, ResourcePath};
use crate::domain::GatewayError;

/// Per-route admission contract: which resource the route spends, which key
/// kind it expects, and whether demo credentials are accepted at all
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub resource: ResourcePath,
    pub expected_kind: CredentialKind,
    pub supports_demo: bool,
}

impl RouteSpec {
    /// Builds a route spec. `expected_kind` must be `Public` or `Private`;
    /// a demo expectation is a wiring mistake, not a runtime state.
    pub fn new(
        resource: ResourcePath,
        expected_kind: CredentialKind,
        supports_demo: bool,
    ) -> Result<Self, GatewayError> {
        if expected_kind == CredentialKind::Demo {
            return Err(GatewayError::configuration(
                "Routes must expect a public or private key, not demo",
            ));
        }

        Ok(Self {
            resource,
            expected_kind,
            supports_demo,
        })
    }
}

/// Request-side inputs the orchestrator needs from the transport layer
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Bearer credential, already stripped of the `Bearer ` prefix.
    pub bearer: Option<String>,
    /// Raw `x-forwarded-for` header value, if present.
    pub forwarded_for: Option<String>,
    /// Raw `x-real-ip` header value, if present.
    pub real_ip: Option<String>,
}

impl RequestMeta {
    /// Caller IP: first `x-forwarded-for` entry, falling back to
    /// `x-real-ip`. `None` when neither parses as an address.
    pub fn client_ip(&self) -> Option<IpAddr> {
        if let Some(forwarded) = &self.forwarded_for {
            if let Some(first) = forwarded.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return Some(ip);
                }
            }
        }

        self.real_ip.as_ref()?.trim().parse().ok()
    }
}

/// Identity a request is rate-limited under: organization for keyed traffic,
/// caller IP for demo traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerIdentity {
    Demo { ip: IpAddr },
    Organization(OrganizationId),
}

impl CallerIdentity {
    /// The counter-store identity component.
    pub fn bucket_id(&self) -> String {
        match self {
            Self::Demo { ip } => ip.to_string(),
            Self::Organization(org) => org.as_str().to_string(),
        }
    }

    /// Quota is only tracked for keyed traffic; demo quota lives in the
    /// shared template under a reserved identity.
    pub fn quota_owner(&self) -> &str {
        match self {
            Self::Demo { .. } => "DEMO",
            Self::Organization(org) => org.as_str(),
        }
    }
}

/// Context handed to the protected handler on admission so it can make
/// resource-aware decisions without re-resolving entitlements
#[derive(Debug, Clone)]
pub struct AdmissionContext {
    pub identity: CallerIdentity,
    pub entitlement: ResolvedEntitlement,
}

/// A rejected admission: data, not an unwound exception
#[derive(Debug)]
pub struct RateLimitRejection {
    pub error: GatewayError,
    /// RPM units observed for the window, including the unit charged to the
    /// request that tipped the ceiling.
    pub rpm_used: u64,
    /// Quota counter value after any decrement charged to this request;
    /// `None` when quota is unlimited or no record exists. Lets the reply
    /// headers report the live counter instead of the resolve-time value.
    pub quota_remaining: Option<i64>,
}

impl RateLimitRejection {
    pub fn status(&self) -> u16 {
        self.error.http_status()
    }

    pub fn retry_after(&self) -> Option<u64> {
        self.error.retry_after()
    }
}

/// Unit of communication between the limit enforcer and the orchestrator
///
/// Every caller must inspect the variant; rejections never propagate by
/// unwinding.
#[derive(Debug)]
pub enum EnforcementResult {
    Admitted {
        /// RPM units used in the current window, 0 when RPM is unbounded.
        rpm_used: u64,
        /// Remaining quota after consumption, `None` for unlimited quota.
        quota_remaining: Option<i64>,
    },
    Rejected(RateLimitRejection),
}

impl EnforcementResult {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_spec_rejects_demo_expectation() {
        let resource = ResourcePath::new("search.text").unwrap();
        assert!(RouteSpec::new(resource, CredentialKind::Demo, true).is_err());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let meta = RequestMeta {
            forwarded_for: Some("203.0.113.9, 10.0.0.1".to_string()),
            real_ip: Some("198.51.100.4".to_string()),
            ..Default::default()
        };

        assert_eq!(meta.client_ip().unwrap().to_string(), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let meta = RequestMeta {
            real_ip: Some(" 198.51.100.4 ".to_string()),
            ..Default::default()
        };

        assert_eq!(meta.client_ip().unwrap().to_string(), "198.51.100.4");
    }

    #[test]
    fn test_client_ip_undeterminable() {
        assert!(RequestMeta::default().client_ip().is_none());

        let garbage = RequestMeta {
            forwarded_for: Some("not-an-ip".to_string()),
            ..Default::default()
        };
        assert!(garbage.client_ip().is_none());
    }

    #[test]
    fn test_bucket_id_per_identity() {
        let demo = CallerIdentity::Demo {
            ip: "203.0.113.9".parse().unwrap(),
        };
        assert_eq!(demo.bucket_id(), "203.0.113.9");
        assert_eq!(demo.quota_owner(), "DEMO");

        let org = CallerIdentity::Organization(OrganizationId::new("org-1"));
        assert_eq!(org.bucket_id(), "org-1");
        assert_eq!(org.quota_owner(), "org-1");
    }
}
