//! Credential resolver
//!
//! Determines a bearer token's kind and, for non-demo keys, authenticates it
//! and decodes the embedded organization payload.

use std::sync::Arc;

use tracing::debug;

use crate::domain::credential::{
    CredentialKind, KeyData, ParsedCredential, ResolvedCredential,
};
use crate::domain::GatewayError;

use super::authenticator::KeyAuthenticator;
use super::cipher::PayloadCipher;

#[derive(Debug, Clone)]
pub struct CredentialResolver {
    demo_key: String,
    cipher: Arc<dyn PayloadCipher>,
    authenticator: Arc<dyn KeyAuthenticator>,
}

impl CredentialResolver {
    pub fn new(
        demo_key: impl Into<String>,
        cipher: Arc<dyn PayloadCipher>,
        authenticator: Arc<dyn KeyAuthenticator>,
    ) -> Self {
        Self {
            demo_key: demo_key.into(),
            cipher,
            authenticator,
        }
    }

    /// Resolves a bearer credential against the kind the route expects.
    ///
    /// The demo constant is matched before any parsing or cryptographic work.
    /// Cipher failures and payload-parse failures are distinct errors; both
    /// surface as authentication failures.
    pub fn resolve(
        &self,
        bearer: &str,
        expected_kind: CredentialKind,
    ) -> Result<ResolvedCredential, GatewayError> {
        if bearer == self.demo_key {
            debug!("Resolved demo credential");
            return Ok(ResolvedCredential::Demo);
        }

        let parsed = ParsedCredential::parse(bearer)?;

        self.authenticator.authenticate(expected_kind, &parsed)?;

        let plaintext = self.cipher.open(parsed.payload, parsed.iv)?;

        let key_data: KeyData = serde_json::from_str(&plaintext)
            .map_err(|_| GatewayError::credential("Failed to parse API key payload"))?;

        debug!(kind = %expected_kind, "Resolved keyed credential");

        Ok(ResolvedCredential::Keyed {
            kind: expected_kind,
            key_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credential::{HmacPayloadCipher, PrefixKeyAuthenticator};

    const DEMO_KEY: &str = "demo-0000-shared";

    fn resolver() -> (CredentialResolver, HmacPayloadCipher) {
        let cipher = HmacPayloadCipher::new("test-secret");
        let resolver = CredentialResolver::new(
            DEMO_KEY,
            Arc::new(cipher.clone()),
            Arc::new(PrefixKeyAuthenticator::default()),
        );
        (resolver, cipher)
    }

    fn public_key(cipher: &HmacPayloadCipher, json: &str) -> String {
        format!("pk-live-{}", cipher.seal(json, None))
    }

    #[test]
    fn test_demo_constant_short_circuits() {
        let (resolver, _) = resolver();

        let resolved = resolver.resolve(DEMO_KEY, CredentialKind::Public).unwrap();
        assert!(matches!(resolved, ResolvedCredential::Demo));
    }

    #[test]
    fn test_resolve_public_key() {
        let (resolver, cipher) = resolver();
        let bearer = public_key(&cipher, r#"{"organization_id":"org-1"}"#);

        let resolved = resolver.resolve(&bearer, CredentialKind::Public).unwrap();
        match resolved {
            ResolvedCredential::Keyed { kind, key_data } => {
                assert_eq!(kind, CredentialKind::Public);
                assert_eq!(key_data.require_organization_id().unwrap().as_str(), "org-1");
            }
            other => panic!("expected keyed credential, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_private_key_with_iv() {
        let (resolver, cipher) = resolver();
        let bearer = format!(
            "sk-live-{}::beef",
            cipher.seal(r#"{"organization_id":"org-2"}"#, Some("beef"))
        );

        let resolved = resolver.resolve(&bearer, CredentialKind::Private).unwrap();
        assert_eq!(resolved.kind(), CredentialKind::Private);
    }

    #[test]
    fn test_kind_mismatch_fails_authentication() {
        let (resolver, cipher) = resolver();
        let bearer = public_key(&cipher, r#"{"organization_id":"org-1"}"#);

        let err = resolver.resolve(&bearer, CredentialKind::Private).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_decrypt_and_parse_failures_are_distinct() {
        let (resolver, cipher) = resolver();

        let tampered = "pk-live-AAAA.0123456789abcdef";
        let decrypt_err = resolver
            .resolve(tampered, CredentialKind::Public)
            .unwrap_err();
        assert!(decrypt_err.to_string().contains("decrypt"));

        let not_json = format!("pk-live-{}", cipher.seal("not json at all", None));
        let parse_err = resolver
            .resolve(&not_json, CredentialKind::Public)
            .unwrap_err();
        assert!(parse_err.to_string().contains("parse"));

        assert_eq!(decrypt_err.http_status(), 401);
        assert_eq!(parse_err.http_status(), 401);
    }

    #[test]
    fn test_payload_without_organization_decodes() {
        let (resolver, cipher) = resolver();
        let bearer = public_key(&cipher, r#"{"issued_at":1720000000}"#);

        // Decoding succeeds; the missing identity only errors at use.
        let resolved = resolver.resolve(&bearer, CredentialKind::Public).unwrap();
        match resolved {
            ResolvedCredential::Keyed { key_data, .. } => {
                assert!(key_data.require_organization_id().is_err());
            }
            other => panic!("expected keyed credential, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_bearer_fails_fast() {
        let (resolver, _) = resolver();

        let err = resolver.resolve("garbage", CredentialKind::Public).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }
}
