//! Entitlement infrastructure - subscription store, plan cache and resolver

mod plan_cache;
mod resolver;
mod store;

pub use plan_cache::PlanCache;
pub use resolver::EntitlementResolver;
pub use store::{InMemorySubscriptionStore, SubscriptionStore};
