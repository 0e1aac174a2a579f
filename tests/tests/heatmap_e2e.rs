//! Tests for cached heatmap snapshots and the raw-point debugger endpoint.

use axum::http::StatusCode;
use axum_test::{TestRequest, TestServer};
use integration_tests::{fixtures, setup::TestContext};

const PAGE: &str = "https://shop.example/pricing";

fn heatmap_request(server: &TestServer, page: &str) -> TestRequest {
    server
        .get("/heatmap")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("page", page)
        .add_query_param("type", "click")
        .add_header("X-Admin-Token", &fixtures::admin_token())
}

async fn seed_clicks(server: &TestServer, page: &str, points: &[(f64, f64)]) {
    let events: Vec<serde_json::Value> = points
        .iter()
        .map(|&(x, y)| fixtures::click_event(&uuid::Uuid::new_v4().to_string(), page, x, y))
        .collect();
    server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes(fixtures::array_payload(events).into())
        .await
        .assert_status_ok();
}

/// Click points snap to the 10px grid with per-cell weights.
#[tokio::test]
async fn test_click_snapshot_snaps_to_grid() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_clicks(&server, PAGE, &[(12.0, 18.0), (14.0, 11.0), (33.0, 7.0)]).await;

    let response = heatmap_request(&server, PAGE).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_interactions"], 3);

    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    let dense = points
        .iter()
        .find(|p| p["x"] == 10.0 && p["y"] == 10.0)
        .expect("expected a dense cell at (10,10)");
    assert_eq!(dense["value"], 2);
}

/// Snapshots are cached; regenerate=true recomputes.
#[tokio::test]
async fn test_snapshot_cache_and_regenerate() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_clicks(&server, PAGE, &[(12.0, 18.0)]).await;

    let first = heatmap_request(&server, PAGE).await;
    first.assert_status_ok();
    let first: serde_json::Value = first.json();
    assert_eq!(first["total_interactions"], 1);

    // New clicks land, but the warm snapshot is served unchanged.
    seed_clicks(&server, PAGE, &[(50.0, 50.0)]).await;
    let cached = heatmap_request(&server, PAGE).await;
    let cached: serde_json::Value = cached.json();
    assert_eq!(cached["total_interactions"], 1);
    assert_eq!(cached["generated_at"], first["generated_at"]);

    // Regeneration bypasses and overwrites the entry.
    let fresh = heatmap_request(&server, PAGE)
        .add_query_param("regenerate", "true")
        .await;
    let fresh: serde_json::Value = fresh.json();
    assert_eq!(fresh["total_interactions"], 2);

    // The overwrite is now the cached snapshot.
    let after = heatmap_request(&server, PAGE).await;
    let after: serde_json::Value = after.json();
    assert_eq!(after["total_interactions"], 2);
}

/// A pattern page aggregates every matching concrete URL.
#[tokio::test]
async fn test_pattern_page_aggregates_urls() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_clicks(&server, "https://shop.example/products/1", &[(12.0, 18.0)]).await;
    seed_clicks(&server, "https://shop.example/products/2", &[(14.0, 11.0)]).await;
    seed_clicks(&server, "https://shop.example/checkout", &[(90.0, 90.0)]).await;

    let response = heatmap_request(&server, "/products/:id").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_interactions"], 2);
}

/// Device narrows the point cloud.
#[tokio::test]
async fn test_device_filter_narrows_points() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut mobile = fixtures::click_event("m-sess", PAGE, 12.0, 18.0);
    mobile["deviceInfo"] = serde_json::json!({ "type": "mobile" });
    let desktop = fixtures::click_event("d-sess", PAGE, 33.0, 7.0);
    server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes(fixtures::array_payload(vec![mobile, desktop]).into())
        .await
        .assert_status_ok();

    let response = heatmap_request(&server, PAGE)
        .add_query_param("device", "mobile")
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_interactions"], 1);
}

/// Unknown heatmap types answer a coded 400.
#[tokio::test]
async fn test_unknown_type_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get("/heatmap")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("page", PAGE)
        .add_query_param("type", "sparkle")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// The raw endpoint returns ungrouped unit-weight points.
#[tokio::test]
async fn test_raw_points_are_ungrouped() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_clicks(&server, PAGE, &[(12.0, 18.0), (14.0, 11.0)]).await;

    let response = server
        .get("/heatmap/raw")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("page", PAGE)
        .add_query_param("type", "click")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p["value"] == 1));
}

/// Heatmap reads are role-gated.
#[tokio::test]
async fn test_heatmap_requires_admin_token() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get("/heatmap")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("page", PAGE)
        .add_query_param("type", "click")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
