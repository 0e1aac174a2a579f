//! Live-mirroring types shared between the relay and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::EventType;

/// The single active live-recording slot.
///
/// Stored as a keyed record in the shared store so every server instance
/// observes the same state; a new start overwrites it (last-writer-wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRecording {
    pub recording_id: String,
    pub project_id: String,
    pub admin_id: String,
    pub started_at: DateTime<Utc>,
}

/// Lightweight notification published to a project room after each
/// persisted interaction. Fire-and-forget; carries no payload body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveNotification {
    pub event_type: EventType,
    pub page_url: String,
    /// Unix ms.
    pub timestamp: i64,
}
