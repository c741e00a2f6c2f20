//! Credential domain - bearer kinds and decoded key payloads

mod entity;

pub use entity::{CredentialKind, KeyData, ParsedCredential, ResolvedCredential};
