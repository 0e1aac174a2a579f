//! Funnel definition and analysis handlers.

use std::time::Instant;

use analytics::{analyze_funnel, FunnelReport};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use engine_core::{Funnel, FunnelDefinition, SegmentFilters};
use event_store::InteractionQuery;
use serde::Deserialize;
use telemetry::metrics;
use uuid::Uuid;

use crate::extractors::AdminGate;
use crate::response::ApiError;
use crate::routes::resolve_window;
use crate::state::AppState;

/// POST /funnels - Creates an immutable funnel definition.
pub async fn create_funnel(
    State(state): State<AppState>,
    _gate: AdminGate,
    Json(definition): Json<FunnelDefinition>,
) -> Result<(StatusCode, Json<Funnel>), ApiError> {
    let funnel = definition.into_funnel()?;
    state.store.create_funnel(funnel.clone()).await?;
    Ok((StatusCode::CREATED, Json(funnel)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelListParams {
    pub project_id: String,
}

/// GET /funnels - Lists a project's funnels.
pub async fn list_funnels(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<FunnelListParams>,
) -> Result<Json<Vec<Funnel>>, ApiError> {
    let funnels = state.store.list_funnels(&params.project_id).await?;
    Ok(Json(funnels))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeParams {
    pub from: Option<i64>,
    pub to: Option<i64>,
    // Segment filters narrowing the filtered run.
    pub device: Option<String>,
    pub country: Option<String>,
    pub utm_source: Option<String>,
    pub referrer_contains: Option<String>,
    pub path_prefix: Option<String>,
}

/// GET /funnels/{id}/analyze - Baseline-vs-filtered conversion analysis.
pub async fn analyze_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Path(funnel_id): Path<Uuid>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<FunnelReport>, ApiError> {
    let start = Instant::now();

    let funnel = state
        .store
        .get_funnel(funnel_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("funnel {} not found", funnel_id)))?;

    let (from, to) = resolve_window(params.from, params.to)?;
    let query = InteractionQuery::window(&funnel.project_id, from, to);
    let interactions = state.store.query_interactions(&query).await?;

    let filters = SegmentFilters {
        device: params.device,
        country: params.country,
        utm_source: params.utm_source,
        referrer_contains: params.referrer_contains,
        path_prefix: params.path_prefix,
    };

    let report = state
        .budget
        .run(move || analyze_funnel(&funnel, &interactions, &filters))
        .await?;

    metrics().funnel_analyses.inc();
    metrics()
        .aggregation_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(Json(report))
}
