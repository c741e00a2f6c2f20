//! Entitlement entities and related types

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::domain::GatewayError;

use super::tree::EntitlementTree;

/// Organization identifier embedded in credentials and subscription records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plan identifier resolved from an organization's active subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dot-separated path addressing one leaf of an entitlement tree
/// (e.g. `api.v4.chat`). Segments are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn new(path: impl Into<String>) -> Result<Self, GatewayError> {
        let path = path.into();

        if path.is_empty() {
            return Err(GatewayError::validation("Resource path must not be empty"));
        }

        if path.split('.').any(|segment| segment.is_empty()) {
            return Err(GatewayError::validation(format!(
                "Resource path '{}' contains an empty segment",
                path
            )));
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.0
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quota or RPM ceiling
///
/// Serialized as a JSON number for finite ceilings and the string
/// `"unlimited"` for unbounded ones. `"Infinity"` is accepted on input for
/// compatibility with existing entitlement documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    Finite(u64),
}

impl Limit {
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// The finite ceiling, if any.
    pub fn ceiling(&self) -> Option<u64> {
        match self {
            Self::Finite(n) => Some(*n),
            Self::Unlimited => None,
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(n) => serializer.serialize_u64(*n),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Limit::Finite(n)),
            Raw::Text(s) if s.eq_ignore_ascii_case("unlimited") || s == "Infinity" => {
                Ok(Limit::Unlimited)
            }
            Raw::Text(s) => Err(de::Error::custom(format!("invalid limit value '{}'", s))),
        }
    }
}

/// Leaf record of an entitlement tree describing what an organization (or
/// demo traffic) may do for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntitlement {
    /// Whether the resource may be called at all
    pub access: bool,
    /// Rolling monthly call budget
    pub quota: Limit,
    /// Requests-per-minute ceiling
    pub rpm: Limit,
}

impl ResourceEntitlement {
    pub fn new(access: bool, quota: Limit, rpm: Limit) -> Self {
        Self { access, quota, rpm }
    }

    /// Full access with no ceilings.
    pub fn unlimited() -> Self {
        Self {
            access: true,
            quota: Limit::Unlimited,
            rpm: Limit::Unlimited,
        }
    }
}

/// An organization's live quota document: the entitlement tree derived from
/// its plan, the current billing period boundary, and the remaining quota
/// per resource as of the last store write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDocument {
    pub organization_id: OrganizationId,
    pub plan_id: PlanId,
    pub entitlements: EntitlementTree,
    /// End of the current billing period
    pub period_end: DateTime<Utc>,
}

/// Entitlement leaf resolved for one request, carrying the billing period
/// boundary so the header builder never needs a second lookup
#[derive(Debug, Clone)]
pub struct ResolvedEntitlement {
    pub resource: ResourcePath,
    pub entitlement: ResourceEntitlement,
    pub period_end: DateTime<Utc>,
    /// Last-known remaining quota, `None` when the quota is unlimited.
    pub quota_remaining: Option<i64>,
}
