//! Tests for the role-gated session listing and detail endpoints.

use axum::http::StatusCode;
use axum_test::TestServer;
use event_store::EventStore;
use integration_tests::{fixtures, setup::TestContext};

async fn seed_session(server: &TestServer, session_id: &str, page_url: &str) {
    server
        .post("/track/session")
        .content_type("application/json")
        .json(&fixtures::chunk_upload(session_id, page_url))
        .await
        .assert_status_ok();
}

/// The listing requires an admin token.
#[tokio::test]
async fn test_sessions_require_admin_token() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_001");

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_header("X-Admin-Token", "not-an-admin-token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_002");
}

/// Bearer tokens are accepted as well as the explicit header.
#[tokio::test]
async fn test_bearer_token_gates_the_listing() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_header(
            "Authorization",
            &format!("Bearer {}", fixtures::admin_token()),
        )
        .await;
    response.assert_status_ok();
}

/// Listing paginates newest-first with a stable total.
#[tokio::test]
async fn test_listing_paginates() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for i in 0..25 {
        seed_session(&server, &format!("sess-{}", i), "https://shop.example/a").await;
    }

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("pageSize", "10")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 25);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 10);
    assert_eq!(body["page"], 1);

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("pageSize", "10")
        .add_query_param("page", "3")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["sessions"].as_array().unwrap().len(), 5);
}

/// hasErrors narrows to sessions with console errors.
#[tokio::test]
async fn test_has_errors_filter() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_session(&server, "clean-sess", "https://shop.example/a").await;

    let mut broken = fixtures::chunk_upload("broken-sess", "https://shop.example/b");
    broken["consoleLogs"] =
        serde_json::json!([{ "level": "error", "message": "TypeError: boom" }]);
    server
        .post("/track/session")
        .content_type("application/json")
        .json(&broken)
        .await
        .assert_status_ok();

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("hasErrors", "true")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["sessions"][0]["session_id"], "broken-sess");
}

/// urlContains matches any visited page.
#[tokio::test]
async fn test_url_contains_filter() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_session(&server, "shop-sess", "https://shop.example/products/1").await;
    seed_session(&server, "checkout-sess", "https://shop.example/checkout").await;

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("urlContains", "checkout")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["sessions"][0]["session_id"], "checkout-sess");
}

/// hasRage resolves rage bursts through the anomaly detector first.
#[tokio::test]
async fn test_has_rage_filter() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_session(&server, "rage-sess", "https://shop.example/a").await;
    seed_session(&server, "calm-sess", "https://shop.example/a").await;

    let base = chrono::Utc::now() - chrono::Duration::seconds(30);
    let mut rows = Vec::new();
    for ms in [0, 300, 600, 900] {
        rows.push(fixtures::click_row(
            "rage-sess",
            "buy-now",
            base + chrono::Duration::milliseconds(ms),
        ));
    }
    rows.push(fixtures::click_row("calm-sess", "buy-now", base));
    ctx.store.insert_interactions(rows).await.unwrap();

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("hasRage", "true")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["sessions"][0]["session_id"], "rage-sess");
}

/// hasRage with no bursts short-circuits to an empty page.
#[tokio::test]
async fn test_has_rage_filter_empty() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_session(&server, "calm-sess", "https://shop.example/a").await;

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("hasRage", "true")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 0);
    assert!(body["sessions"].as_array().unwrap().is_empty());
}

/// Without date bounds the listing spans the whole retention horizon;
/// explicit bounds still narrow it.
#[tokio::test]
async fn test_unbounded_listing_includes_old_sessions() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut old = engine_core::SessionRecording::new("old-sess", fixtures::PROJECT_ID);
    old.start_time = chrono::Utc::now() - chrono::Duration::days(40);
    ctx.store.insert_session(old);
    seed_session(&server, "fresh-sess", "https://shop.example/a").await;

    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 2);

    let now = chrono::Utc::now().timestamp_millis();
    let response = server
        .get("/sessions")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_query_param("from", now - 60 * 60 * 1000)
        .add_query_param("to", now)
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["sessions"][0]["session_id"], "fresh-sess");
}

/// Session detail returns the full recording, or a coded 404.
#[tokio::test]
async fn test_session_detail_and_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    seed_session(&server, "detail-sess", "https://shop.example/a").await;

    let response = server
        .get("/sessions/detail-sess")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["session_id"], "detail-sess");
    assert_eq!(body["stats"]["chunk_count"], 1);

    let response = server
        .get("/sessions/never-seen")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "QUERY_404");
}
