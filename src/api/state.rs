//! Application state for shared services

use std::sync::Arc;

use crate::domain::counter::CounterStore;
use crate::domain::credential::CredentialKind;
use crate::domain::gateway::RouteSpec;
use crate::domain::entitlement::ResourcePath;
use crate::domain::GatewayError;
use crate::infrastructure::gateway::AdmissionGateway;

/// The admission contracts of the gated routes, built once at startup so a
/// misconfigured route fails the boot instead of a request
#[derive(Debug, Clone)]
pub struct GatedRoutes {
    pub text_search: RouteSpec,
    pub report_export: RouteSpec,
}

impl GatedRoutes {
    pub fn new() -> Result<Self, GatewayError> {
        Ok(Self {
            text_search: RouteSpec::new(
                ResourcePath::new("search.text")?,
                CredentialKind::Public,
                true,
            )?,
            report_export: RouteSpec::new(
                ResourcePath::new("reports.export")?,
                CredentialKind::Private,
                false,
            )?,
        })
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AdmissionGateway>,
    pub counters: Arc<dyn CounterStore>,
    pub routes: GatedRoutes,
}

impl AppState {
    pub fn new(
        gateway: Arc<AdmissionGateway>,
        counters: Arc<dyn CounterStore>,
        routes: GatedRoutes,
    ) -> Self {
        Self {
            gateway,
            counters,
            routes,
        }
    }
}
