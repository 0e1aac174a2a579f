//! Error-handling tests for the ingest pipeline.
//!
//! Verifies coded error responses for malformed payloads, size caps,
//! admission control, and storage failures.

use api::RateLimitConfig;
use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup, setup::TestContext};

/// Invalid JSON returns VALID_001.
#[tokio::test]
async fn test_invalid_json_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/track/interaction")
        .content_type("application/json")
        .bytes("not json at all".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// A scalar body is not a recognized payload shape.
#[tokio::test]
async fn test_scalar_body_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes("42".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// An object that is neither a batch envelope nor a single event.
#[tokio::test]
async fn test_unrecognized_object_shape_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/track/interaction")
        .content_type("application/json")
        .bytes(r#"{"foo":"bar"}"#.into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// An event with no project id anywhere is rejected.
#[tokio::test]
async fn test_missing_project_id_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut event = fixtures::sdk_event("click");
    event.as_object_mut().unwrap().remove("projectId");

    let response = server
        .post("/track/interaction")
        .content_type("application/json")
        .bytes(fixtures::single_payload(event).into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(ctx.store.interaction_count(), 0);
}

/// A batch over the event cap returns VALID_002.
#[tokio::test]
async fn test_batch_exceeds_event_cap_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let payload = fixtures::array_payload(fixtures::oversized_batch());
    let response = server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// A payload over the byte cap returns VALID_003 before parsing.
#[tokio::test]
async fn test_payload_exceeds_byte_cap_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let body = "x".repeat(engine_core::limits::MAX_BATCH_SIZE_BYTES + 1);
    let response = server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes(body.into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_003");
}

/// A chunk over the byte cap returns VALID_003.
#[tokio::test]
async fn test_chunk_exceeds_byte_cap_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut upload = fixtures::chunk_upload("sess-big", "https://shop.example/a");
    upload["chunk"]["data"] =
        serde_json::Value::String("e".repeat(engine_core::limits::MAX_CHUNK_SIZE_BYTES + 1));

    let response = server
        .post("/track/session")
        .content_type("application/json")
        .json(&upload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_003");
}

/// A timestamp older than the staleness bound is rejected.
#[tokio::test]
async fn test_stale_timestamp_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut event = fixtures::sdk_event("click");
    event["timestamp"] =
        (chrono::Utc::now().timestamp_millis() - 48 * 60 * 60 * 1000).into();

    let response = server
        .post("/track/interaction")
        .content_type("application/json")
        .bytes(fixtures::single_payload(event).into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(ctx.store.interaction_count(), 0);
}

/// Exhausting a project/session bucket returns RATE_001 with a retry hint.
#[tokio::test]
async fn test_rate_limit_returns_429_with_retry_after() {
    let ctx = TestContext::with_rate_limit(RateLimitConfig { rate: 1, burst: 2 });
    let server = ctx.server();

    for _ in 0..2 {
        let payload =
            fixtures::single_payload(fixtures::sdk_event_with_session("click", "hot-sess"));
        server
            .post("/track/interaction")
            .content_type("application/json")
            .bytes(payload.into())
            .await
            .assert_status_ok();
    }

    let payload = fixtures::single_payload(fixtures::sdk_event_with_session("click", "hot-sess"));
    let response = server
        .post("/track/interaction")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let retry_after = response.headers().get("Retry-After").cloned();
    assert!(retry_after.is_some(), "429 must carry a Retry-After header");
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "RATE_001");
}

/// Buckets are independent per project/session key.
#[tokio::test]
async fn test_rate_limit_keys_are_independent() {
    let ctx = TestContext::with_rate_limit(RateLimitConfig { rate: 1, burst: 1 });
    let server = ctx.server();

    for session in ["sess-a", "sess-b", "sess-c"] {
        let payload = fixtures::single_payload(fixtures::sdk_event_with_session("click", session));
        server
            .post("/track/interaction")
            .content_type("application/json")
            .bytes(payload.into())
            .await
            .assert_status_ok();
    }
}

/// A rate-limited batch is rejected whole.
#[tokio::test]
async fn test_rate_limited_batch_rejected_whole() {
    let ctx = TestContext::with_rate_limit(RateLimitConfig { rate: 1, burst: 3 });
    let server = ctx.server();

    let events: Vec<serde_json::Value> = (0..5)
        .map(|_| fixtures::sdk_event_with_session("click", "burst-sess"))
        .collect();
    let response = server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes(fixtures::array_payload(events).into())
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(ctx.store.interaction_count(), 0);
}

/// Storage failures surface as STORE_001.
#[tokio::test]
async fn test_storage_failure_returns_500() {
    let server: TestServer = setup::failing_server();

    let payload = fixtures::single_payload(fixtures::sdk_event("click"));
    let response = server
        .post("/track/interaction")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "STORE_001");
}

/// An empty batch is accepted with nothing to do.
#[tokio::test]
async fn test_empty_batch_accepted() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/track/interactions/batch")
        .content_type("application/json")
        .bytes("[]".into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["received"], 0);
}
