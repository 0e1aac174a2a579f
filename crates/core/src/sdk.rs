//! SDK wire types and transformation to stored rows.
//!
//! This module handles:
//! - Parsing tracking payloads (camelCase, Unix ms timestamps)
//! - Validating required fields
//! - Transforming to the stored `Interaction` row
//! - Supporting 3 payload shapes (array, object with events, single)

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::events::{extract_path, EventType, Interaction, InteractionMetadata};
use crate::limits::{MAX_EVENT_AGE_HOURS, MAX_FUTURE_SKEW_SECS};

/// Device information from the upstream enrichment step.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// desktop | mobile | tablet
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
}

/// Location information from the upstream enrichment step.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationInfo {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// Positional/element metadata as sent by the SDK (camelCase).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SdkMetadata {
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[validate(length(max = 256))]
    pub element_id: Option<String>,
    #[validate(length(max = 512))]
    pub element_classes: Option<String>,
    #[validate(length(max = 64))]
    pub element_tag: Option<String>,
    #[validate(length(max = 200))]
    pub element_text: Option<String>,
    /// Scroll depth as percentage (0-100).
    #[validate(range(min = 0.0, max = 100.0))]
    pub scroll_depth: Option<f64>,
    /// Horizontal viewport percentage (0-100).
    #[validate(range(min = 0.0, max = 100.0))]
    pub x_percent: Option<f64>,
    /// Vertical viewport percentage (0-100).
    #[validate(range(min = 0.0, max = 100.0))]
    pub y_percent: Option<f64>,
    #[validate(length(max = 64))]
    pub action: Option<String>,
}

impl SdkMetadata {
    fn into_stored(self) -> InteractionMetadata {
        InteractionMetadata {
            x: self.x,
            y: self.y,
            element_id: self.element_id,
            element_classes: self.element_classes,
            element_tag: self.element_tag,
            element_text: self.element_text,
            scroll_depth: self.scroll_depth,
            x_percent: self.x_percent,
            y_percent: self.y_percent,
            action: self.action,
        }
    }
}

/// A tracking event as received from the SDK (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SdkInteraction {
    /// Session ID (required).
    pub session_id: String,

    /// Event type (required).
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Full page URL (required).
    #[validate(length(max = 2048))]
    pub page_url: String,

    /// Project partition key; may instead be supplied once on the batch
    /// envelope.
    pub project_id: Option<String>,

    /// Optional user ID.
    #[validate(length(max = 128))]
    pub user_id: Option<String>,

    /// Name for custom events.
    #[validate(length(max = 100))]
    pub event_name: Option<String>,

    /// Unix timestamp in milliseconds; server time when omitted.
    pub timestamp: Option<i64>,

    /// Referrer URL.
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,

    /// Positional/element metadata.
    #[validate(nested)]
    pub metadata: Option<SdkMetadata>,

    /// Upstream device enrichment.
    pub device_info: Option<DeviceInfo>,

    /// Upstream location enrichment.
    pub location: Option<LocationInfo>,
}

/// Batch envelope metadata sent by the SDK.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SdkBatchMetadata {
    pub sdk_version: Option<String>,
    pub flushed_at: Option<i64>,
    pub queue_size: Option<u32>,
}

/// Parsed tracking payload (supports 3 shapes).
#[derive(Debug, Clone)]
pub struct TrackPayload {
    /// Project id from the envelope, applied to events that omit their own.
    pub project_id: Option<String>,
    pub events: Vec<SdkInteraction>,
    pub metadata: Option<SdkBatchMetadata>,
}

impl TrackPayload {
    /// Parse a tracking payload from JSON bytes.
    /// Supports:
    /// 1. Array: `[event, event, ...]`
    /// 2. Object with events: `{ "projectId": "...", "events": [...], "metadata": {...} }`
    /// 3. Single event: `{ "sessionId": "...", "type": "...", ... }`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation(format!("invalid JSON: {}", e)))?;

        match &value {
            // Shape 1: array of events
            Value::Array(_) => {
                let events: Vec<SdkInteraction> = serde_json::from_value(value)
                    .map_err(|e| Error::validation(format!("invalid event array: {}", e)))?;
                Ok(Self {
                    project_id: None,
                    events,
                    metadata: None,
                })
            }

            // Shape 2 or 3: object
            Value::Object(obj) => {
                if obj.contains_key("events") {
                    #[derive(Deserialize)]
                    #[serde(rename_all = "camelCase")]
                    struct Wrapper {
                        project_id: Option<String>,
                        events: Vec<SdkInteraction>,
                        metadata: Option<SdkBatchMetadata>,
                    }
                    let wrapper: Wrapper = serde_json::from_value(value)
                        .map_err(|e| Error::validation(format!("invalid batch object: {}", e)))?;
                    Ok(Self {
                        project_id: wrapper.project_id,
                        events: wrapper.events,
                        metadata: wrapper.metadata,
                    })
                } else if obj.contains_key("sessionId") && obj.contains_key("type") {
                    let event: SdkInteraction = serde_json::from_value(value)
                        .map_err(|e| Error::validation(format!("invalid single event: {}", e)))?;
                    Ok(Self {
                        project_id: None,
                        events: vec![event],
                        metadata: None,
                    })
                } else {
                    Err(Error::validation(
                        "object must have an 'events' array or be a single event with 'sessionId' and 'type'",
                    ))
                }
            }

            _ => Err(Error::validation(
                "request body must be an array of events or an object",
            )),
        }
    }
}

/// Validate an SDK interaction's required fields and timestamp bounds.
pub fn validate_sdk_interaction(event: &SdkInteraction) -> Result<()> {
    event
        .validate()
        .map_err(|e| Error::validation(format!("{}", e)))?;

    if event.session_id.is_empty() {
        return Err(Error::missing_field("sessionId"));
    }
    if event.page_url.is_empty() {
        return Err(Error::missing_field("pageUrl"));
    }

    if let Some(ts) = event.timestamp {
        let now = Utc::now().timestamp_millis();
        if ts > now + MAX_FUTURE_SKEW_SECS * 1000 {
            return Err(Error::validation(format!(
                "timestamp cannot be more than {}s in the future",
                MAX_FUTURE_SKEW_SECS
            )));
        }
        if ts < now - MAX_EVENT_AGE_HOURS * 60 * 60 * 1000 {
            return Err(Error::validation(format!(
                "timestamp cannot be more than {}h in the past",
                MAX_EVENT_AGE_HOURS
            )));
        }
    }

    Ok(())
}

impl Interaction {
    /// Transform an SDK event into the stored row.
    pub fn from_sdk(event: SdkInteraction, project_id: &str) -> Result<Self> {
        let timestamp = match event.timestamp {
            Some(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| Error::validation("invalid timestamp"))?,
            None => Utc::now(),
        };

        let path = extract_path(&event.page_url);

        let device = event
            .device_info
            .as_ref()
            .and_then(|d| d.device_type.clone())
            .unwrap_or_else(|| "unknown".into());

        let country = event
            .location
            .as_ref()
            .and_then(|l| l.country.clone())
            .unwrap_or_else(|| "unknown".into());

        Ok(Self {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            session_id: event.session_id,
            user_id: event.user_id,
            event_type: event.event_type,
            event_name: event.event_name,
            page_url: event.page_url,
            path,
            device,
            country,
            referrer: event.referrer.unwrap_or_default(),
            metadata: event.metadata.map(SdkMetadata::into_stored).unwrap_or_default(),
            timestamp,
            received_at: Utc::now(),
        })
    }
}
