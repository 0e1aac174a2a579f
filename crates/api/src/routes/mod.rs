//! API routes.

pub mod funnels;
pub mod health;
pub mod heatmap;
pub mod ingest;
pub mod insights;
pub mod live;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use engine_core::{limits::MAX_CHUNK_SIZE_BYTES, QueryErrorCode};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Widest window an aggregation read may span.
pub(crate) const MAX_WINDOW_DAYS: i64 = 30;

/// Window applied when the caller gives no bounds.
pub(crate) const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Resolves optional `from`/`to` Unix-ms bounds into a bounded window.
/// Defaults to the last 24 hours; windows over 30 days are rejected.
pub(crate) fn resolve_window(
    from_ms: Option<i64>,
    to_ms: Option<i64>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let parse = |ms: i64| {
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| ApiError::bad_request(format!("invalid timestamp: {}", ms)))
    };

    let to = match to_ms {
        Some(ms) => parse(ms)?,
        None => Utc::now(),
    };
    let from = match from_ms {
        Some(ms) => parse(ms)?,
        None => to - Duration::hours(DEFAULT_WINDOW_HOURS),
    };

    if from > to {
        return Err(ApiError::bad_request("'from' must precede 'to'"));
    }
    if to - from > Duration::days(MAX_WINDOW_DAYS) {
        return Err(engine_core::Error::query(
            QueryErrorCode::WindowTooLarge,
            format!("window exceeds the {}-day cap", MAX_WINDOW_DAYS),
        )
        .into());
    }
    Ok((from, to))
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/track/interaction", post(ingest::track_interaction))
        .route("/track/interactions/batch", post(ingest::track_batch))
        // The chunk route accepts bodies past the 4MB data cap so the
        // oversized-chunk rejection can answer with a coded error instead
        // of the extractor's bare 413.
        .route(
            "/track/session",
            post(ingest::upload_chunk).layer(DefaultBodyLimit::max(MAX_CHUNK_SIZE_BYTES * 2)),
        )
        .route("/track/session/:id/complete", post(ingest::complete_session))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/heatmap", get(heatmap::heatmap_handler))
        .route("/heatmap/raw", get(heatmap::raw_handler))
        .route("/interactions/summary", get(insights::summary_handler))
        .route("/interactions/scroll-depth", get(insights::scroll_depth_handler))
        .route("/interactions/top-clicks", get(insights::top_clicks_handler))
        .route("/interactions/attention", get(insights::attention_handler))
        .route("/interactions/rage-clicks", get(insights::rage_clicks_handler))
        .route("/interactions/dead-clicks", get(insights::dead_clicks_handler))
        .route("/funnels", post(funnels::create_funnel).get(funnels::list_funnels))
        .route("/funnels/:id/analyze", get(funnels::analyze_handler))
        .route("/live", get(live::live_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/internal/metrics", get(health::metrics_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
