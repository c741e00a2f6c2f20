//! Infrastructure layer - adapters and concrete implementations of the
//! domain seams

pub mod counter;
pub mod credential;
pub mod entitlement;
pub mod gateway;
pub mod logging;
