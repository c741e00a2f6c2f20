//! Payload cipher seam
//!
//! The gateway treats key-payload decryption as an external primitive behind
//! [`PayloadCipher`]. The bundled implementation is an HMAC-authenticated
//! base64 encoding: enough to exercise the seam and reject tampered
//! credentials, while a deployment substitutes its real cipher.

use std::fmt::Debug;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Opens the encrypted third segment of a credential into plaintext JSON
pub trait PayloadCipher: Send + Sync + Debug {
    /// Decrypts `payload`, mixing in the credential's IV suffix when one is
    /// present (private keys carry one). Failure is a credential error,
    /// distinguishable from a JSON-parse failure downstream.
    fn open(&self, payload: &str, iv: Option<&str>) -> Result<String, GatewayError>;
}

/// HMAC-SHA256 authenticated payload codec
///
/// Wire shape: `base64url(plaintext).hex(tag)` where the tag covers the
/// encoded plaintext and the IV bytes.
#[derive(Clone)]
pub struct HmacPayloadCipher {
    secret: Vec<u8>,
}

impl Debug for HmacPayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacPayloadCipher")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl HmacPayloadCipher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Produces a payload segment for `plaintext`, the inverse of
    /// [`PayloadCipher::open`]. Used to mint fixture credentials.
    pub fn seal(&self, plaintext: &str, iv: Option<&str>) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(plaintext.as_bytes());

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("any key length is valid");
        mac.update(encoded.as_bytes());
        if let Some(iv) = iv {
            mac.update(iv.as_bytes());
        }

        format!("{}.{}", encoded, hex::encode(mac.finalize().into_bytes()))
    }
}

impl PayloadCipher for HmacPayloadCipher {
    fn open(&self, payload: &str, iv: Option<&str>) -> Result<String, GatewayError> {
        let (encoded, tag_hex) = payload
            .rsplit_once('.')
            .ok_or_else(|| GatewayError::credential("Failed to decrypt API key payload"))?;

        let tag = hex::decode(tag_hex)
            .map_err(|_| GatewayError::credential("Failed to decrypt API key payload"))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("any key length is valid");
        mac.update(encoded.as_bytes());
        if let Some(iv) = iv {
            mac.update(iv.as_bytes());
        }

        mac.verify_slice(&tag)
            .map_err(|_| GatewayError::credential("Failed to decrypt API key payload"))?;

        let plaintext = URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .map_err(|_| GatewayError::credential("Failed to decrypt API key payload"))?;

        String::from_utf8(plaintext)
            .map_err(|_| GatewayError::credential("Failed to decrypt API key payload"))
    }
}
