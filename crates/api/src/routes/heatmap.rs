//! Heatmap handlers.

use std::time::Instant;

use analytics::{generate_heatmap, raw_points, HeatmapKey, HeatmapPoint, HeatmapSnapshot, HeatmapType};
use axum::{
    extract::{Query, State},
    Json,
};
use engine_core::UrlPattern;
use event_store::{InteractionQuery, PageSelector};
use serde::Deserialize;
use telemetry::metrics;

use crate::extractors::AdminGate;
use crate::response::ApiError;
use crate::routes::resolve_window;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapParams {
    pub project_id: String,
    /// Concrete URL, or a pattern page with `:param` / `*` segments.
    pub page: String,
    /// click | hover | scroll
    #[serde(rename = "type")]
    pub heatmap_type: String,
    pub device: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    /// Bypass the cache and overwrite the snapshot.
    #[serde(default)]
    pub regenerate: bool,
}

fn parse_type(s: &str) -> Result<HeatmapType, ApiError> {
    HeatmapType::parse(s)
        .ok_or_else(|| ApiError::bad_request(format!("unknown heatmap type: {}", s)))
}

fn page_selector(page: &str) -> Result<PageSelector, ApiError> {
    if UrlPattern::is_pattern(page) {
        Ok(PageSelector::Pattern(UrlPattern::compile(page)?))
    } else {
        Ok(PageSelector::Exact(page.to_string()))
    }
}

/// GET /heatmap - Cached heatmap snapshot for a page.
pub async fn heatmap_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<HeatmapParams>,
) -> Result<Json<HeatmapSnapshot>, ApiError> {
    let heatmap_type = parse_type(&params.heatmap_type)?;
    let selector = page_selector(&params.page)?;
    let (from, to) = resolve_window(params.from, params.to)?;

    let key = HeatmapKey {
        project_id: params.project_id.clone(),
        page: params.page.clone(),
        heatmap_type,
        device: params.device.clone(),
    };

    let snapshot = state
        .heatmaps
        .get_or_generate(key, params.regenerate, || async {
            let start = Instant::now();
            let mut query = InteractionQuery::window(&params.project_id, from, to);
            query.event_type = Some(heatmap_type.event_type());
            query.page = Some(selector);
            query.device = params.device.clone();
            let interactions = state.store.query_interactions(&query).await?;

            let snapshot = state
                .budget
                .run(move || generate_heatmap(&interactions, heatmap_type))
                .await?;
            metrics().heatmaps_generated.inc();
            metrics()
                .aggregation_latency_ms
                .observe(start.elapsed().as_millis() as u64);
            Ok(snapshot)
        })
        .await?;

    Ok(Json(snapshot.as_ref().clone()))
}

/// GET /heatmap/raw - Ungrouped points for the overlay debugger.
/// Always bypasses the cache.
pub async fn raw_handler(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<HeatmapParams>,
) -> Result<Json<Vec<HeatmapPoint>>, ApiError> {
    let heatmap_type = parse_type(&params.heatmap_type)?;
    let selector = page_selector(&params.page)?;
    let (from, to) = resolve_window(params.from, params.to)?;

    let mut query = InteractionQuery::window(&params.project_id, from, to);
    query.event_type = Some(heatmap_type.event_type());
    query.page = Some(selector);
    query.device = params.device;
    let interactions = state.store.query_interactions(&query).await?;

    let points = state
        .budget
        .run(move || raw_points(&interactions, heatmap_type))
        .await?;
    Ok(Json(points))
}
