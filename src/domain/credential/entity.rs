//! Credential entities and wire format

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::OrganizationId;
use crate::domain::GatewayError;

/// The three disjoint credential kinds accepted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// The single shared demo constant; no cryptographic work involved.
    Demo,
    Public,
    Private,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Demo => write!(f, "demo"),
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Structural pieces of a non-demo bearer credential
///
/// Wire shape: at least three hyphen-delimited segments. The third segment
/// carries the encrypted payload; private keys append an initialization
/// vector after a `::` separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCredential<'a> {
    pub prefix: &'a str,
    pub label: &'a str,
    pub payload: &'a str,
    pub iv: Option<&'a str>,
}

impl<'a> ParsedCredential<'a> {
    /// Splits a bearer string into its segments. Fails fast on malformed
    /// input; no partial object is ever produced.
    pub fn parse(bearer: &'a str) -> Result<Self, GatewayError> {
        let mut segments = bearer.splitn(3, '-');

        let (prefix, label, rest) = match (segments.next(), segments.next(), segments.next()) {
            (Some(prefix), Some(label), Some(rest))
                if !prefix.is_empty() && !label.is_empty() && !rest.is_empty() =>
            {
                (prefix, label, rest)
            }
            _ => {
                return Err(GatewayError::credential("Malformed API key"));
            }
        };

        let (payload, iv) = match rest.split_once("::") {
            Some((payload, iv)) => (payload, Some(iv)),
            None => (rest, None),
        };

        if payload.is_empty() {
            return Err(GatewayError::credential("Malformed API key"));
        }

        Ok(Self {
            prefix,
            label,
            payload,
            iv,
        })
    }
}

/// Decoded credential payload
///
/// Decoding succeeds even without an organization id; the same decode path
/// serves multiple purposes and the missing field only becomes an error when
/// the identity is actually needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl KeyData {
    /// The embedded organization identity, or a credential error where it is
    /// required but absent.
    pub fn require_organization_id(&self) -> Result<&OrganizationId, GatewayError> {
        self.organization_id
            .as_ref()
            .ok_or_else(|| GatewayError::credential("API key carries no organization identity"))
    }
}

/// Outcome of credential resolution
#[derive(Debug, Clone)]
pub enum ResolvedCredential {
    Demo,
    Keyed {
        kind: CredentialKind,
        key_data: KeyData,
    },
}

impl ResolvedCredential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::Demo => CredentialKind::Demo,
            Self::Keyed { kind, .. } => *kind,
        }
    }
}
