//! Aggregation engine and anomaly detector.
//!
//! Everything here is pull-based: handlers fetch the bounded interaction
//! window from the store and run these computations on demand. The heatmap
//! cache is the only piece of shared mutable state.

pub mod anomaly;
pub mod attention;
pub mod budget;
pub mod funnel;
pub mod heatmap;
pub mod summary;

pub use anomaly::*;
pub use attention::*;
pub use budget::QueryBudget;
pub use funnel::*;
pub use heatmap::*;
pub use summary::*;
