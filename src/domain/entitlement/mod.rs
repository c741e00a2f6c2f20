//! Entitlement domain - resources, limits and the entitlement tree

mod entity;
pub mod period;
mod tree;

pub use entity::{
    Limit, OrganizationId, PlanId, QuotaDocument, ResolvedEntitlement, ResourceEntitlement,
    ResourcePath,
};
pub use tree::{EntitlementTree, Node};
