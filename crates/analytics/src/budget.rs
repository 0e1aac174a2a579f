//! Hard time budget for aggregation compute.
//!
//! Heatmap generation, funnel analysis, and anomaly scans run on the
//! blocking pool under a timeout so an oversized window can never pin a
//! worker indefinitely.

use std::time::Duration;

use engine_core::{Error, QueryErrorCode, Result};
use telemetry::metrics;

/// Default compute budget.
pub const DEFAULT_QUERY_BUDGET: Duration = Duration::from_secs(10);

/// Time budget applied to every aggregation query.
#[derive(Debug, Clone, Copy)]
pub struct QueryBudget {
    pub max_duration: Duration,
}

impl Default for QueryBudget {
    fn default() -> Self {
        Self {
            max_duration: DEFAULT_QUERY_BUDGET,
        }
    }
}

impl QueryBudget {
    pub fn new(max_duration: Duration) -> Self {
        Self { max_duration }
    }

    /// Runs CPU-bound compute on the blocking pool, failing with a
    /// `QUERY_001` error when the budget is exceeded.
    pub async fn run<T, F>(&self, compute: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let budget = self.max_duration;
        let task = tokio::task::spawn_blocking(compute);
        match tokio::time::timeout(budget, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_err)) => Err(Error::internal(format!(
                "aggregation task failed: {}",
                join_err
            ))),
            Err(_) => {
                metrics().query_budget_exceeded.inc();
                Err(Error::query(
                    QueryErrorCode::BudgetExceeded,
                    format!("aggregation exceeded the {:?} budget", budget),
                ))
            }
        }
    }
}
