//! Internal telemetry for the Glimpse capture engine.
//!
//! Instead of external metrics systems, we dogfood our own counters:
//! snapshots are served on an internal endpoint and logged periodically.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
