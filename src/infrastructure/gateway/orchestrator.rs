//! Gateway orchestrator
//!
//! Sequences credential resolution, entitlement lookup and limit enforcement
//! for a single request, and invokes the protected handler only on
//! admission. Every path, success or failure, normalizes into one structured
//! reply shape; no error escapes the orchestrator boundary.

use std::future::Future;

use tracing::{debug, error};

use crate::domain::credential::{CredentialKind, ResolvedCredential};
use crate::domain::gateway::{
    AdmissionContext, CallerIdentity, EnforcementResult, RequestMeta, RouteSpec,
};
use crate::domain::GatewayError;
use crate::infrastructure::credential::CredentialResolver;
use crate::infrastructure::entitlement::EntitlementResolver;

use super::enforcer::LimitEnforcer;
use super::headers::RateLimitHeaders;

/// What a protected handler hands back to the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerReply {
    Data {
        /// Defaults to 200 when absent.
        status: Option<u16>,
        data: serde_json::Value,
    },
    Error {
        /// Defaults to 400 when absent.
        status: Option<u16>,
        message: String,
    },
}

impl HandlerReply {
    pub fn data(data: serde_json::Value) -> Self {
        Self::Data { status: None, data }
    }

    pub fn data_with_status(status: u16, data: serde_json::Value) -> Self {
        Self::Data {
            status: Some(status),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            status: None,
            message: message.into(),
        }
    }

    pub fn error_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Error {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Uniform reply for every gated invocation
///
/// Success and failure are distinct variants with their own fields; there is
/// no ambiguous state carrying both data and an error.
#[derive(Debug)]
pub enum GatewayReply {
    Success {
        status: u16,
        data: serde_json::Value,
        headers: RateLimitHeaders,
    },
    Failure {
        status: u16,
        error: String,
        headers: RateLimitHeaders,
    },
}

impl GatewayReply {
    pub fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. } | Self::Failure { status, .. } => *status,
        }
    }

    pub fn headers(&self) -> &RateLimitHeaders {
        match self {
            Self::Success { headers, .. } | Self::Failure { headers, .. } => headers,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn denied(error: &GatewayError, headers: RateLimitHeaders) -> Self {
        let headers = match error.retry_after() {
            Some(seconds) => headers.with_retry_after(seconds),
            None => headers,
        };

        Self::Failure {
            status: error.http_status(),
            error: error.to_string(),
            headers,
        }
    }
}

/// The admission-control façade guarding protected handlers
#[derive(Debug, Clone)]
pub struct AdmissionGateway {
    credentials: CredentialResolver,
    entitlements: EntitlementResolver,
    enforcer: LimitEnforcer,
}

impl AdmissionGateway {
    pub fn new(
        credentials: CredentialResolver,
        entitlements: EntitlementResolver,
        enforcer: LimitEnforcer,
    ) -> Self {
        Self {
            credentials,
            entitlements,
            enforcer,
        }
    }

    /// Runs the admission pipeline and, on success, the protected handler.
    ///
    /// The handler receives the [`AdmissionContext`] so it can feature-gate
    /// within a single endpoint without re-resolving entitlements. A handler
    /// error is downgraded to a generic 500; the cause is logged, never
    /// exposed.
    pub async fn invoke<F, Fut>(
        &self,
        route: &RouteSpec,
        meta: &RequestMeta,
        handler: F,
    ) -> GatewayReply
    where
        F: FnOnce(AdmissionContext) -> Fut,
        Fut: Future<Output = Result<HandlerReply, anyhow::Error>>,
    {
        let (context, rpm_used) = match self.admit(route, meta).await {
            Ok(admission) => admission,
            Err(reply) => return *reply,
        };

        let headers =
            RateLimitHeaders::for_entitlement(&context.entitlement, Some(rpm_used));

        match handler(context).await {
            Ok(HandlerReply::Data { status, data }) => GatewayReply::Success {
                status: status.unwrap_or(200),
                data,
                headers,
            },
            Ok(HandlerReply::Error { status, message }) => GatewayReply::Failure {
                status: status.unwrap_or(400),
                error: message,
                headers,
            },
            Err(cause) => {
                let fault = GatewayError::handler(cause.to_string());
                error!(resource = %route.resource, %fault, "Protected handler failed");
                GatewayReply::Failure {
                    status: fault.http_status(),
                    error: "Internal server error".to_string(),
                    headers,
                }
            }
        }
    }

    /// The admission pipeline up to, but excluding, the handler.
    ///
    /// Failures come back as complete replies carrying the best-effort
    /// headers known at the point of failure.
    async fn admit(
        &self,
        route: &RouteSpec,
        meta: &RequestMeta,
    ) -> Result<(AdmissionContext, u64), Box<GatewayReply>> {
        let resource_headers = || RateLimitHeaders::resource_only(&route.resource);
        let fail = |error: GatewayError, headers: RateLimitHeaders| {
            Box::new(GatewayReply::denied(&error, headers))
        };

        let Some(ip) = meta.client_ip() else {
            return Err(fail(
                GatewayError::validation("Unable to determine client IP"),
                resource_headers(),
            ));
        };

        let Some(bearer) = meta.bearer.as_deref() else {
            return Err(fail(
                GatewayError::credential("Missing API key"),
                resource_headers(),
            ));
        };

        let credential = self
            .credentials
            .resolve(bearer, route.expected_kind)
            .map_err(|e| fail(e, resource_headers()))?;

        let identity = match credential {
            ResolvedCredential::Demo => {
                // Demo checks run before any store access.
                if route.expected_kind == CredentialKind::Private {
                    return Err(fail(
                        GatewayError::validation(
                            "Demo keys cannot be used on private endpoints",
                        ),
                        resource_headers(),
                    ));
                }

                if !route.supports_demo {
                    return Err(fail(
                        GatewayError::validation(
                            "Demo keys are not supported for this endpoint",
                        ),
                        resource_headers(),
                    ));
                }

                CallerIdentity::Demo { ip }
            }
            ResolvedCredential::Keyed { key_data, .. } => {
                let organization_id = key_data
                    .require_organization_id()
                    .map_err(|e| fail(e, resource_headers()))?
                    .clone();

                CallerIdentity::Organization(organization_id)
            }
        };

        let resolved = self
            .entitlements
            .resolve(&identity, &route.resource)
            .await
            .map_err(|e| fail(e, resource_headers()))?;

        if !resolved.entitlement.access {
            // Resolution completed, so full entitlement headers are known.
            let headers = RateLimitHeaders::for_entitlement(&resolved, None);
            return Err(fail(
                GatewayError::access_denied(route.resource.as_str()),
                headers,
            ));
        }

        let enforcement = self
            .enforcer
            .enforce(&identity, &resolved)
            .await
            .map_err(|e| fail(e, RateLimitHeaders::for_entitlement(&resolved, None)))?;

        match enforcement {
            EnforcementResult::Admitted {
                rpm_used,
                quota_remaining,
            } => {
                debug!(
                    resource = %route.resource,
                    identity = %identity.bucket_id(),
                    rpm_used,
                    "Request admitted"
                );

                let mut entitlement = resolved;
                if quota_remaining.is_some() {
                    entitlement.quota_remaining = quota_remaining;
                }

                Ok((
                    AdmissionContext {
                        identity,
                        entitlement,
                    },
                    rpm_used,
                ))
            }
            EnforcementResult::Rejected(rejection) => {
                // Report the counter as the enforcer left it, not the
                // resolve-time snapshot.
                let mut resolved = resolved;
                if rejection.quota_remaining.is_some() {
                    resolved.quota_remaining = rejection.quota_remaining;
                }

                let headers =
                    RateLimitHeaders::for_entitlement(&resolved, Some(rejection.rpm_used));
                Err(fail(rejection.error, headers))
            }
        }
    }
}
