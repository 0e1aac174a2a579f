//! HTTP API layer for the capture engine.

pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use middleware::rate_limit::{RateLimitConfig, RateLimiter};
pub use routes::router;
pub use state::{AppState, RoleClient};
