//! Credential infrastructure - cipher, authenticator and resolver

mod authenticator;
mod cipher;
mod resolver;

pub use authenticator::{KeyAuthenticator, PrefixKeyAuthenticator};
pub use cipher::{HmacPayloadCipher, PayloadCipher};
pub use resolver::CredentialResolver;
