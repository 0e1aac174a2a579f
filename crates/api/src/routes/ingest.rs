//! Ingestion gateway handlers.
//!
//! Accepts SDK tracking payloads in 3 shapes:
//! 1. Array: `[event, event, ...]`
//! 2. Object with events: `{ "projectId": "...", "events": [...] }`
//! 3. Single event: `{ "sessionId": "...", "type": "...", ... }`
//!
//! Admin self-traffic and excluded paths are dropped as a soft success
//! (`tracked: false`) so SDK clients never enter a retry loop over them.

use std::collections::HashMap;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use engine_core::{
    is_excluded_path,
    limits::{MAX_BATCH_EVENTS, MAX_BATCH_SIZE_BYTES},
    validate_sdk_interaction, Error, Interaction, LiveNotification, SdkChunkUpload,
    SdkInteraction, TrackPayload, ValidationErrorCode,
};
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::response::{ApiError, ChunkResponse, IngestResponse};
use crate::state::AppState;

/// Resolves the project id from the event or the batch envelope.
fn project_of(event: &SdkInteraction, envelope: Option<&str>) -> Result<String, Error> {
    event
        .project_id
        .clone()
        .or_else(|| envelope.map(String::from))
        .ok_or_else(|| Error::missing_field("projectId"))
}

/// Whether this event must be dropped before any write.
async fn is_filtered(state: &AppState, event: &SdkInteraction) -> bool {
    if is_excluded_path(&event.page_url) {
        return true;
    }
    match event.user_id.as_deref() {
        Some(user_id) => state.role_client.is_admin_user(user_id).await,
        None => false,
    }
}

fn publish_notification(state: &AppState, row: &Interaction) {
    state.relay.publish_notification(
        &row.project_id,
        LiveNotification {
            event_type: row.event_type,
            page_url: row.page_url.clone(),
            timestamp: row.timestamp.timestamp_millis(),
        },
    );
    metrics().notifications_published.inc();
}

/// POST /track/interaction - Single-event ingestion.
pub async fn track_interaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let start = Instant::now();
    metrics().interactions_received.inc();

    let payload = TrackPayload::parse(&body)?;
    let mut events = payload.events;
    if events.len() != 1 {
        return Err(ApiError::bad_request(
            "expected exactly one event; use /track/interactions/batch for batches",
        ));
    }
    let event = events.remove(0);

    let project_id = project_of(&event, payload.project_id.as_deref())?;
    validate_sdk_interaction(&event).inspect_err(|_| {
        metrics().interactions_rejected.inc();
    })?;

    if let Err(e) = state.rate_limiter.admit(&project_id, &event.session_id, 1) {
        metrics().rate_limited_requests.inc();
        return Err(e.into());
    }

    if is_filtered(&state, &event).await {
        metrics().interactions_filtered.inc();
        debug!(project_id = %project_id, "Interaction filtered");
        return Ok(Json(IngestResponse::single(false)));
    }

    let row = Interaction::from_sdk(event, &project_id)?;
    state.store.insert_interactions(vec![row.clone()]).await?;
    metrics().interactions_persisted.inc();
    publish_notification(&state, &row);

    metrics()
        .ingest_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(Json(IngestResponse::single(true)))
}

/// POST /track/interactions/batch - Batched ingestion.
///
/// Per-event validation failures reject only the offending events; the
/// response carries their error messages alongside the counts.
pub async fn track_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let start = Instant::now();
    metrics().batches_received.inc();

    if body.len() > MAX_BATCH_SIZE_BYTES {
        return Err(ApiError::validation(
            ValidationErrorCode::PayloadTooLarge.code(),
            vec![format!(
                "Payload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_BATCH_SIZE_BYTES / 1024
            )],
        ));
    }

    let payload = TrackPayload::parse(&body)?;
    let total = payload.events.len();
    metrics().interactions_received.inc_by(total as u64);

    if total > MAX_BATCH_EVENTS {
        return Err(ApiError::validation(
            ValidationErrorCode::BatchTooLarge.code(),
            vec![format!(
                "Batch has {} events, exceeds {} limit",
                total, MAX_BATCH_EVENTS
            )],
        ));
    }

    // Admission: one token per event, per project/session key, before any
    // validation work.
    let mut costs: HashMap<(String, String), u32> = HashMap::new();
    for event in &payload.events {
        if let Ok(project_id) = project_of(event, payload.project_id.as_deref()) {
            *costs
                .entry((project_id, event.session_id.clone()))
                .or_insert(0) += 1;
        }
    }
    for ((project_id, session_id), cost) in &costs {
        if let Err(e) = state.rate_limiter.admit(project_id, session_id, *cost) {
            metrics().rate_limited_requests.inc();
            return Err(e.into());
        }
    }

    let envelope_project = payload.project_id.clone();
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut filtered = 0usize;

    for event in payload.events {
        let project_id = match project_of(&event, envelope_project.as_deref()) {
            Ok(id) => id,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };
        if let Err(e) = validate_sdk_interaction(&event) {
            errors.push(e.to_string());
            continue;
        }
        if is_filtered(&state, &event).await {
            filtered += 1;
            continue;
        }
        match Interaction::from_sdk(event, &project_id) {
            Ok(row) => rows.push(row),
            Err(e) => errors.push(e.to_string()),
        }
    }

    let received = rows.len();
    if !rows.is_empty() {
        state.store.insert_interactions(rows.clone()).await?;
        metrics().interactions_persisted.inc_by(received as u64);
        for row in &rows {
            publish_notification(&state, row);
        }
    }

    metrics().interactions_filtered.inc_by(filtered as u64);
    metrics().interactions_rejected.inc_by(errors.len() as u64);
    if !errors.is_empty() {
        warn!(
            received = received,
            rejected = errors.len(),
            "Some events failed validation"
        );
    }

    metrics()
        .ingest_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    info!(
        received = received,
        filtered = filtered,
        rejected = errors.len(),
        "Batch processed"
    );

    Ok(Json(IngestResponse::partial(received, filtered, errors)))
}

/// POST /track/session - Session chunk upload.
pub async fn upload_chunk(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChunkResponse>, ApiError> {
    let start = Instant::now();
    metrics().chunks_received.inc();

    let upload: SdkChunkUpload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid chunk upload: {}", e)))?;

    let project_id = upload
        .project_id
        .clone()
        .ok_or_else(|| Error::missing_field("projectId"))?;
    let session_id = upload.session_id.clone();

    if let Err(e) = state.rate_limiter.admit(&project_id, &session_id, 1) {
        metrics().rate_limited_requests.inc();
        return Err(e.into());
    }

    if let Some(user_id) = upload.user_id.as_deref() {
        if state.role_client.is_admin_user(user_id).await {
            debug!(session_id = %session_id, "Session chunk filtered (admin traffic)");
            return Ok(Json(ChunkResponse {
                success: true,
                session_id,
                chunk_count: 0,
                tracked: false,
            }));
        }
    }

    let upload = upload.into_upload()?;
    let session = state.store.apply_chunk_upload(&project_id, upload).await?;

    metrics()
        .chunk_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(Json(ChunkResponse {
        success: true,
        session_id: session.session_id,
        chunk_count: session.stats.chunk_count,
        tracked: true,
    }))
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub success: bool,
    /// False when the session id was never seen (idempotent no-op).
    pub completed: bool,
}

/// POST /track/session/{id}/complete - Marks a session complete.
pub async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let completed = state.store.complete_session(&session_id).await?;
    if completed {
        metrics().sessions_completed.inc();
    } else {
        debug!(session_id = %session_id, "Completion for unknown session ignored");
    }
    Ok(Json(CompleteResponse {
        success: true,
        completed,
    }))
}
