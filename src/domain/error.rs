use thiserror::Error;

/// Core gateway errors
///
/// Every variant maps to a fixed HTTP status; the mapping lives on
/// [`GatewayError::http_status`] so the enforcement pipeline can report a
/// status without pulling HTTP types into the domain.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("No active subscription: {message}")]
    NoSubscription { message: String },

    #[error("No entitlement for resource '{resource}'")]
    EntitlementNotFound { resource: String },

    #[error("Access denied for resource '{resource}'")]
    AccessDenied { resource: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Seconds the caller should wait before retrying.
        retry_after: u64,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Handler error: {message}")]
    Handler { message: String },
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    pub fn no_subscription(message: impl Into<String>) -> Self {
        Self::NoSubscription {
            message: message.into(),
        }
    }

    pub fn entitlement_not_found(resource: impl Into<String>) -> Self {
        Self::EntitlementNotFound {
            resource: resource.into(),
        }
    }

    pub fn access_denied(resource: impl Into<String>) -> Self {
        Self::AccessDenied {
            resource: resource.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: u64) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// HTTP status the error class maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Credential { .. } => 401,
            Self::NoSubscription { .. }
            | Self::EntitlementNotFound { .. }
            | Self::AccessDenied { .. } => 403,
            Self::RateLimited { .. } => 429,
            Self::Configuration { .. } | Self::Storage { .. } | Self::Handler { .. } => 500,
        }
    }

    /// The `Retry-After` value, present on rate-limit errors only.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}
