//! Read-model and anomaly handlers over a bounded interaction window.

use std::time::Instant;

use analytics::{
    attention_bands, detect_dead_clicks, detect_rage_clicks, interactions_summary,
    scroll_depth_distribution, top_clicked_elements, AnomalyRollup, AttentionReport,
    InteractionsSummary, ScrollDepthBucket, TopClickedElement, DEFAULT_BANDS,
    DEFAULT_DEAD_IDLE_MS, DEFAULT_RAGE_THRESHOLD, DEFAULT_RAGE_WINDOW_MS,
};
use axum::{
    extract::{Query, State},
    Json,
};
use engine_core::{EventType, Interaction};
use event_store::{InteractionQuery, PageSelector};
use serde::Deserialize;
use telemetry::metrics;

use crate::extractors::AdminGate;
use crate::response::ApiError;
use crate::routes::resolve_window;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightParams {
    pub project_id: String,
    pub page: Option<String>,
    pub device: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    /// Attention band count (clamped 2..40).
    pub bands: Option<usize>,
    /// Top-clicks result cap.
    pub limit: Option<usize>,
    /// Rage window override, milliseconds.
    pub window_ms: Option<i64>,
    /// Rage click-count threshold override.
    pub threshold: Option<usize>,
    /// Dead-click idle horizon override, milliseconds.
    pub idle_ms: Option<i64>,
}

async fn load_window(
    state: &AppState,
    params: &InsightParams,
    event_type: Option<EventType>,
) -> Result<Vec<Interaction>, ApiError> {
    let (from, to) = resolve_window(params.from, params.to)?;
    let mut query = InteractionQuery::window(&params.project_id, from, to);
    query.event_type = event_type;
    query.device = params.device.clone();
    if let Some(page) = &params.page {
        query.page = Some(PageSelector::Exact(page.clone()));
    }
    Ok(state.store.query_interactions(&query).await?)
}

/// GET /interactions/summary
pub async fn summary_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<InsightParams>,
) -> Result<Json<InteractionsSummary>, ApiError> {
    let interactions = load_window(&state, &params, None).await?;
    let summary = state
        .budget
        .run(move || interactions_summary(&interactions))
        .await?;
    Ok(Json(summary))
}

/// GET /interactions/scroll-depth
pub async fn scroll_depth_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<InsightParams>,
) -> Result<Json<Vec<ScrollDepthBucket>>, ApiError> {
    let interactions = load_window(&state, &params, Some(EventType::Scroll)).await?;
    let buckets = state
        .budget
        .run(move || scroll_depth_distribution(&interactions))
        .await?;
    Ok(Json(buckets))
}

/// GET /interactions/top-clicks
pub async fn top_clicks_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<InsightParams>,
) -> Result<Json<Vec<TopClickedElement>>, ApiError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let interactions = load_window(&state, &params, Some(EventType::Click)).await?;
    let top = state
        .budget
        .run(move || top_clicked_elements(&interactions, limit))
        .await?;
    Ok(Json(top))
}

/// GET /interactions/attention
pub async fn attention_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<InsightParams>,
) -> Result<Json<AttentionReport>, ApiError> {
    let bands = params.bands.unwrap_or(DEFAULT_BANDS);
    let interactions = load_window(&state, &params, None).await?;
    let report = state
        .budget
        .run(move || attention_bands(&interactions, bands))
        .await?;
    Ok(Json(report))
}

/// GET /interactions/rage-clicks
pub async fn rage_clicks_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<InsightParams>,
) -> Result<Json<Vec<AnomalyRollup>>, ApiError> {
    let start = Instant::now();
    let window_ms = params.window_ms.unwrap_or(DEFAULT_RAGE_WINDOW_MS);
    let threshold = params.threshold.unwrap_or(DEFAULT_RAGE_THRESHOLD);

    let interactions = load_window(&state, &params, Some(EventType::Click)).await?;
    let rollups = state
        .budget
        .run(move || detect_rage_clicks(&interactions, window_ms, threshold))
        .await?;

    metrics().anomaly_scans.inc();
    metrics()
        .aggregation_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(Json(rollups))
}

/// GET /interactions/dead-clicks
pub async fn dead_clicks_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<InsightParams>,
) -> Result<Json<Vec<AnomalyRollup>>, ApiError> {
    let start = Instant::now();
    let idle_ms = params.idle_ms.unwrap_or(DEFAULT_DEAD_IDLE_MS);

    // The dead-click scan needs the full session streams, not just clicks,
    // to observe reactions.
    let interactions = load_window(&state, &params, None).await?;
    let rollups = state
        .budget
        .run(move || detect_dead_clicks(&interactions, idle_ms))
        .await?;

    metrics().anomaly_scans.inc();
    metrics()
        .aggregation_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(Json(rollups))
}
