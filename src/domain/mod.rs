//! Domain layer - gateway types and the seams to external collaborators

pub mod counter;
pub mod credential;
pub mod entitlement;
mod error;
pub mod gateway;

pub use error::GatewayError;
