//! Health check and internal metrics endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics, MetricsSnapshot};

use crate::response::HealthResponse;
use crate::state::AppState;

fn refresh(state: &AppState) {
    if state.store.is_healthy() {
        health().store.set_healthy();
    } else {
        health().store.set_unhealthy("store unavailable");
    }
    // The in-process hub has no failure mode of its own.
    health().relay.set_healthy();
}

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    refresh(&state);
    let report = health().report();

    Json(HealthResponse {
        status: report.status.to_string(),
        store_healthy: health().store.is_healthy(),
        relay_connections: state.hub().connection_count() as u64,
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    refresh(&state);
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /internal/metrics - Current counter snapshot.
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    metrics()
        .active_relay_connections
        .set(state.hub().connection_count() as u64);
    Json(metrics().snapshot())
}
