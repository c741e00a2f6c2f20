//! Gateway infrastructure - limit enforcement, headers and orchestration

mod enforcer;
pub mod headers;
mod orchestrator;

pub use enforcer::{LimitEnforcer, RPM_WINDOW};
pub use headers::RateLimitHeaders;
pub use orchestrator::{AdmissionGateway, GatewayReply, HandlerReply};
