//! Payload builders and stored-row generators.

use chrono::{DateTime, Duration, Utc};
use engine_core::{EventType, Interaction, InteractionMetadata};
use uuid::Uuid;

/// Project id shared by all fixtures.
pub const PROJECT_ID: &str = "proj-test";

/// Admin token accepted by the mock role client.
pub fn admin_token() -> String {
    "adm_dashboard_test".to_string()
}

/// Generate a valid SDK event JSON with a unique session id.
pub fn sdk_event(event_type: &str) -> serde_json::Value {
    sdk_event_with_session(event_type, &Uuid::new_v4().to_string())
}

/// Generate a valid SDK event with a specific session id.
pub fn sdk_event_with_session(event_type: &str, session_id: &str) -> serde_json::Value {
    serde_json::json!({
        "sessionId": session_id,
        "type": event_type,
        "pageUrl": "https://shop.example/products/42",
        "projectId": PROJECT_ID,
        "timestamp": Utc::now().timestamp_millis()
    })
}

/// Generate a click event with coordinates and an element id.
pub fn click_event(session_id: &str, page_url: &str, x: f64, y: f64) -> serde_json::Value {
    serde_json::json!({
        "sessionId": session_id,
        "type": "click",
        "pageUrl": page_url,
        "projectId": PROJECT_ID,
        "timestamp": Utc::now().timestamp_millis(),
        "metadata": { "x": x, "y": y, "elementId": "buy-now" }
    })
}

/// Generate N valid SDK events.
pub fn sdk_events(n: usize) -> Vec<serde_json::Value> {
    (0..n).map(|_| sdk_event("pageview")).collect()
}

/// Generate N valid SDK events of a specific type.
pub fn sdk_events_of_type(n: usize, event_type: &str) -> Vec<serde_json::Value> {
    (0..n).map(|_| sdk_event(event_type)).collect()
}

/// Generate a batch one past the event cap.
pub fn oversized_batch() -> Vec<serde_json::Value> {
    sdk_events(engine_core::limits::MAX_BATCH_EVENTS + 1)
}

/// Serialize events in the bare-array shape.
pub fn array_payload(events: Vec<serde_json::Value>) -> String {
    serde_json::to_string(&events).expect("serialize array payload")
}

/// Serialize events in the enveloped-object shape, carrying the project id
/// once on the envelope.
pub fn object_payload(events: Vec<serde_json::Value>) -> String {
    serde_json::to_string(&serde_json::json!({
        "projectId": PROJECT_ID,
        "events": events,
        "metadata": { "sdkVersion": "2.1.0" }
    }))
    .expect("serialize object payload")
}

/// Serialize one event in the single-event shape.
pub fn single_payload(event: serde_json::Value) -> String {
    serde_json::to_string(&event).expect("serialize single payload")
}

/// Generate a session chunk upload payload.
pub fn chunk_upload(session_id: &str, page_url: &str) -> serde_json::Value {
    serde_json::json!({
        "sessionId": session_id,
        "projectId": PROJECT_ID,
        "chunk": { "codec": "json", "data": "[]", "eventCount": 10 },
        "metadata": { "pageUrl": page_url, "clickCount": 2, "scrollCount": 3 }
    })
}

/// Generate a stored interaction row for direct store seeding.
pub fn interaction_row(session_id: &str, event_type: EventType, path: &str) -> Interaction {
    Interaction {
        id: Uuid::new_v4(),
        project_id: PROJECT_ID.into(),
        session_id: session_id.into(),
        user_id: None,
        event_type,
        event_name: None,
        page_url: format!("https://shop.example{}", path),
        path: path.into(),
        device: "desktop".into(),
        country: "US".into(),
        referrer: String::new(),
        metadata: InteractionMetadata::default(),
        timestamp: Utc::now() - Duration::minutes(5),
        received_at: Utc::now(),
    }
}

/// Generate a stored click row on a specific element at a specific time.
pub fn click_row(session_id: &str, element_id: &str, at: DateTime<Utc>) -> Interaction {
    let mut row = interaction_row(session_id, EventType::Click, "/products/42");
    row.metadata = InteractionMetadata {
        x: Some(100.0),
        y: Some(200.0),
        element_id: Some(element_id.into()),
        element_text: Some("Buy now".into()),
        ..Default::default()
    };
    row.timestamp = at;
    row
}
