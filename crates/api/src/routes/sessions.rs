//! Session listing and detail handlers.

use analytics::{rage_click_sessions, DEFAULT_RAGE_THRESHOLD, DEFAULT_RAGE_WINDOW_MS};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use engine_core::{EventType, SessionRecording};
use event_store::{InteractionQuery, SessionPage, SessionQuery};
use serde::Deserialize;

use crate::extractors::AdminGate;
use crate::response::ApiError;
use crate::routes::resolve_window;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListParams {
    pub project_id: String,
    pub user_id: Option<String>,
    pub has_errors: Option<bool>,
    /// Unix ms bounds on session start time.
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub url_contains: Option<String>,
    pub min_duration: Option<i64>,
    pub device: Option<String>,
    /// Restrict to sessions containing at least one rage burst.
    pub has_rage: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// GET /sessions - Paginated session listing.
pub async fn list_sessions(
    State(state): State<AppState>,
    _gate: AdminGate,
    Query(params): Query<SessionListParams>,
) -> Result<Json<SessionPage>, ApiError> {
    let (from, to) = resolve_window(params.from, params.to)?;
    let explicit_window = params.from.is_some() || params.to.is_some();

    let mut query = SessionQuery::for_project(&params.project_id);
    query.user_id = params.user_id;
    query.has_errors = params.has_errors;
    // The date range is an optional filter. Without bounds the listing
    // covers the whole retention horizon; the resolved window still
    // bounds the rage-click scan below.
    if explicit_window {
        query.from = Some(from);
        query.to = Some(to);
    }
    query.url_contains = params.url_contains;
    query.min_duration_secs = params.min_duration;
    query.device = params.device;
    query.page = params.page.unwrap_or(1);
    query.page_size = params.page_size.unwrap_or(20);

    // The rage filter is resolved by the detector first; the store query
    // then restricts to the matching session ids.
    if params.has_rage == Some(true) {
        let mut clicks = InteractionQuery::window(&params.project_id, from, to);
        clicks.event_type = Some(EventType::Click);
        let interactions = state.store.query_interactions(&clicks).await?;
        let ids = state
            .budget
            .run(move || {
                rage_click_sessions(&interactions, DEFAULT_RAGE_WINDOW_MS, DEFAULT_RAGE_THRESHOLD)
            })
            .await?;
        if ids.is_empty() {
            return Ok(Json(SessionPage {
                sessions: Vec::new(),
                total: 0,
                page: query.page,
                page_size: query.page_size,
            }));
        }
        query.session_ids = Some(ids);
    }

    let page = state.store.query_sessions(&query).await?;
    Ok(Json(page))
}

/// GET /sessions/{id} - Full session recording.
pub async fn get_session(
    State(state): State<AppState>,
    _gate: AdminGate,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRecording>, ApiError> {
    let session = state
        .store
        .get_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session {} not found", session_id)))?;
    Ok(Json(session))
}
