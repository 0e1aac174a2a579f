//! Funnel conversion analysis.
//!
//! Each step's population is the distinct-identity set matching that step's
//! criteria in the window, evaluated independently per step (not a strict
//! sequential join across steps). The analysis runs twice, unfiltered and
//! with segment filters, and reports the lift between the two overall rates
//! in percentage points.

use std::collections::HashSet;

use engine_core::{Funnel, Interaction, SegmentFilters};
use serde::Serialize;

/// Per-step counts and rates.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    /// Distinct identities (user id, or session id when anonymous).
    pub users: u64,
    /// 100 for the first step; `count[i]/count[i-1]×100` afterwards.
    pub conversion_rate: f64,
    /// `100 − conversion_rate`.
    pub dropoff_rate: f64,
}

/// One full funnel run.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelRun {
    pub steps: Vec<StepResult>,
    /// Last-step population over first-step population, percent.
    pub overall_rate: f64,
}

/// Baseline-vs-filtered analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelReport {
    /// The filtered run's steps (equal to baseline when no filters given).
    pub analysis: Vec<StepResult>,
    pub baseline: FunnelRun,
    pub filtered: FunnelRun,
    /// `filtered.overall_rate − baseline.overall_rate`, percentage points.
    pub conversion_lift_pct: f64,
}

fn run_funnel(funnel: &Funnel, interactions: &[Interaction]) -> FunnelRun {
    let mut steps = Vec::with_capacity(funnel.steps.len());
    let mut previous: Option<u64> = None;

    for step in &funnel.steps {
        let users: HashSet<&str> = interactions
            .iter()
            .filter(|i| step.matches(i))
            .map(|i| i.identity())
            .collect();
        let count = users.len() as u64;

        let conversion_rate = match previous {
            // Zero-population first steps yield zero rates, not errors.
            None => {
                if count > 0 {
                    100.0
                } else {
                    0.0
                }
            }
            Some(0) => 0.0,
            Some(prev) => count as f64 / prev as f64 * 100.0,
        };

        steps.push(StepResult {
            name: step.name.clone(),
            users: count,
            conversion_rate,
            dropoff_rate: 100.0 - conversion_rate,
        });
        previous = Some(count);
    }

    let overall_rate = match (steps.first(), steps.last()) {
        (Some(first), Some(last)) if first.users > 0 => {
            last.users as f64 / first.users as f64 * 100.0
        }
        _ => 0.0,
    };

    FunnelRun {
        steps,
        overall_rate,
    }
}

/// Runs the funnel twice (baseline and segment-filtered) and reports the
/// conversion lift.
pub fn analyze_funnel(
    funnel: &Funnel,
    interactions: &[Interaction],
    filters: &SegmentFilters,
) -> FunnelReport {
    let baseline = run_funnel(funnel, interactions);

    let filtered = if filters.is_empty() {
        baseline.clone()
    } else {
        let narrowed: Vec<Interaction> = interactions
            .iter()
            .filter(|i| filters.matches(i))
            .cloned()
            .collect();
        run_funnel(funnel, &narrowed)
    };

    FunnelReport {
        analysis: filtered.steps.clone(),
        conversion_lift_pct: filtered.overall_rate - baseline.overall_rate,
        baseline,
        filtered,
    }
}
