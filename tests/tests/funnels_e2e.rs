//! Tests for funnel definitions and on-demand conversion analysis.

use axum::http::StatusCode;
use axum_test::TestServer;
use engine_core::EventType;
use event_store::EventStore;
use integration_tests::{fixtures, setup::TestContext};

fn checkout_definition() -> serde_json::Value {
    serde_json::json!({
        "projectId": fixtures::PROJECT_ID,
        "name": "checkout",
        "steps": [
            { "name": "Landing", "eventType": "pageview", "pageUrl": "/" },
            { "name": "Checkout", "eventType": "pageview", "pageUrl": "/checkout" }
        ]
    })
}

async fn create_funnel(server: &TestServer, definition: &serde_json::Value) -> serde_json::Value {
    let response = server
        .post("/funnels")
        .content_type("application/json")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .json(definition)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

/// Definitions are created immutable and listed per project.
#[tokio::test]
async fn test_create_and_list_funnels() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let created = create_funnel(&server, &checkout_definition()).await;
    assert!(created["id"].is_string());
    assert_eq!(created["name"], "checkout");
    assert_eq!(created["steps"].as_array().unwrap().len(), 2);

    let response = server
        .get("/funnels")
        .add_query_param("projectId", fixtures::PROJECT_ID)
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let listed: serde_json::Value = response.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
}

/// A single-step definition is refused.
#[tokio::test]
async fn test_single_step_definition_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let definition = serde_json::json!({
        "projectId": fixtures::PROJECT_ID,
        "name": "too-short",
        "steps": [
            { "name": "Landing", "eventType": "pageview", "pageUrl": "/" }
        ]
    });
    let response = server
        .post("/funnels")
        .content_type("application/json")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .json(&definition)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Every step needs a page or element matcher.
#[tokio::test]
async fn test_step_without_matcher_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let definition = serde_json::json!({
        "projectId": fixtures::PROJECT_ID,
        "name": "no-matcher",
        "steps": [
            { "name": "Landing", "eventType": "pageview", "pageUrl": "/" },
            { "name": "Anything", "eventType": "click" }
        ]
    });
    let response = server
        .post("/funnels")
        .content_type("application/json")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .json(&definition)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

/// Baseline analysis counts distinct identities per step.
#[tokio::test]
async fn test_analyze_reports_per_step_conversion() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let created = create_funnel(&server, &checkout_definition()).await;
    let funnel_id = created["id"].as_str().unwrap().to_string();

    // Anonymous traffic, so identity falls back to the session id.
    let mut rows = Vec::new();
    for i in 0..10 {
        rows.push(fixtures::interaction_row(
            &format!("sess-{}", i),
            EventType::Pageview,
            "/",
        ));
    }
    for i in 0..4 {
        rows.push(fixtures::interaction_row(
            &format!("sess-{}", i),
            EventType::Pageview,
            "/checkout",
        ));
    }
    ctx.store.insert_interactions(rows).await.unwrap();

    let response = server
        .get(&format!("/funnels/{}/analyze", funnel_id))
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let report: serde_json::Value = response.json();
    assert_eq!(report["baseline"]["steps"][0]["users"], 10);
    assert_eq!(report["baseline"]["steps"][0]["conversion_rate"], 100.0);
    assert_eq!(report["baseline"]["steps"][1]["users"], 4);
    assert_eq!(report["baseline"]["steps"][1]["conversion_rate"], 40.0);
    assert_eq!(report["baseline"]["steps"][1]["dropoff_rate"], 60.0);
    assert_eq!(report["baseline"]["overall_rate"], 40.0);
    assert_eq!(report["conversion_lift_pct"], 0.0);
}

/// Segment filters run the funnel a second time and report the lift.
#[tokio::test]
async fn test_analyze_with_device_segment_reports_lift() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let created = create_funnel(&server, &checkout_definition()).await;
    let funnel_id = created["id"].as_str().unwrap().to_string();

    // Baseline 10 landing / 2 checkout = 20%; mobile 4 / 1 = 25%.
    let mut rows = Vec::new();
    for i in 0..4 {
        let mut row = fixtures::interaction_row(&format!("m-{}", i), EventType::Pageview, "/");
        row.device = "mobile".into();
        rows.push(row);
    }
    for i in 0..6 {
        rows.push(fixtures::interaction_row(
            &format!("d-{}", i),
            EventType::Pageview,
            "/",
        ));
    }
    let mut converted = fixtures::interaction_row("m-0", EventType::Pageview, "/checkout");
    converted.device = "mobile".into();
    rows.push(converted);
    rows.push(fixtures::interaction_row(
        "d-0",
        EventType::Pageview,
        "/checkout",
    ));
    ctx.store.insert_interactions(rows).await.unwrap();

    let response = server
        .get(&format!("/funnels/{}/analyze", funnel_id))
        .add_query_param("device", "mobile")
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status_ok();
    let report: serde_json::Value = response.json();
    assert_eq!(report["baseline"]["overall_rate"], 20.0);
    assert_eq!(report["filtered"]["overall_rate"], 25.0);
    let lift = report["conversion_lift_pct"].as_f64().unwrap();
    assert!((lift - 5.0).abs() < 1e-9);
}

/// Analyzing an unknown funnel answers a coded 404.
#[tokio::test]
async fn test_analyze_unknown_funnel_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get(&format!("/funnels/{}/analyze", uuid::Uuid::new_v4()))
        .add_header("X-Admin-Token", &fixtures::admin_token())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "QUERY_404");
}

/// Funnel management is role-gated.
#[tokio::test]
async fn test_funnels_require_admin_token() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/funnels")
        .content_type("application/json")
        .json(&checkout_definition())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_001");
}
