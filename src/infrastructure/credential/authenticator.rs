//! Kind-specific key authentication seam

use std::fmt::Debug;

use crate::domain::credential::{CredentialKind, ParsedCredential};
use crate::domain::GatewayError;

/// Validates a parsed credential against its declared kind
///
/// Deployments plug in their signature/validity check here; the gateway only
/// requires that an invalid key comes back as a credential error and an
/// unsupported kind as a configuration error.
pub trait KeyAuthenticator: Send + Sync + Debug {
    fn authenticate(
        &self,
        kind: CredentialKind,
        parsed: &ParsedCredential<'_>,
    ) -> Result<(), GatewayError>;
}

/// Prefix-based authenticator: public keys are minted `pk-...`, private keys
/// `sk-...`, and private keys must carry an IV suffix
#[derive(Debug, Clone)]
pub struct PrefixKeyAuthenticator {
    public_prefix: String,
    private_prefix: String,
}

impl Default for PrefixKeyAuthenticator {
    fn default() -> Self {
        Self {
            public_prefix: "pk".to_string(),
            private_prefix: "sk".to_string(),
        }
    }
}

impl PrefixKeyAuthenticator {
    pub fn new(public_prefix: impl Into<String>, private_prefix: impl Into<String>) -> Self {
        Self {
            public_prefix: public_prefix.into(),
            private_prefix: private_prefix.into(),
        }
    }
}

impl KeyAuthenticator for PrefixKeyAuthenticator {
    fn authenticate(
        &self,
        kind: CredentialKind,
        parsed: &ParsedCredential<'_>,
    ) -> Result<(), GatewayError> {
        let expected_prefix = match kind {
            CredentialKind::Public => &self.public_prefix,
            CredentialKind::Private => &self.private_prefix,
            // Demo never reaches authentication; hitting this is a routing
            // wiring mistake.
            CredentialKind::Demo => {
                return Err(GatewayError::configuration(
                    "Demo credentials are not authenticated",
                ));
            }
        };

        if parsed.prefix != expected_prefix {
            return Err(GatewayError::credential(format!(
                "API key is not a {} key",
                kind
            )));
        }

        if kind == CredentialKind::Private && parsed.iv.is_none() {
            return Err(GatewayError::credential(
                "Private API key is missing its initialization vector",
            ));
        }

        Ok(())
    }
}
