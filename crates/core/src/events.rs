//! Interaction event model.
//!
//! `Interaction` is the append-only stored row; it is produced from the SDK
//! wire format (see [`crate::sdk`]) and never mutated afterwards. Device and
//! location fields arrive pre-parsed from the upstream enrichment step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All supported interaction event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
    Scroll,
    Hover,
    Pageview,
    Custom,
    Error,
}

impl EventType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::Hover => "hover",
            Self::Pageview => "pageview",
            Self::Custom => "custom",
            Self::Error => "error",
        }
    }

    /// Parses the lowercase string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "click" => Some(Self::Click),
            "scroll" => Some(Self::Scroll),
            "hover" => Some(Self::Hover),
            "pageview" => Some(Self::Pageview),
            "custom" => Some(Self::Custom),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional and element metadata attached to an interaction.
///
/// All fields are optional; which ones are present depends on the event type
/// (clicks carry coordinates and element fields, scrolls carry depth, custom
/// events may carry an `action` tag).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionMetadata {
    /// Click/hover x coordinate in page pixels.
    pub x: Option<f64>,
    /// Click/hover y coordinate in page pixels.
    pub y: Option<f64>,
    /// DOM id of the target element.
    pub element_id: Option<String>,
    /// Space-separated class list of the target element.
    pub element_classes: Option<String>,
    /// Tag name of the target element.
    pub element_tag: Option<String>,
    /// Truncated text content of the target element.
    pub element_text: Option<String>,
    /// Scroll depth as a percentage of page height (0-100).
    pub scroll_depth: Option<f64>,
    /// Horizontal position as a percentage of viewport width (0-100).
    pub x_percent: Option<f64>,
    /// Vertical position as a percentage of viewport height (0-100).
    pub y_percent: Option<f64>,
    /// Action tag on custom events (e.g. "navigate", "open-modal").
    pub action: Option<String>,
}

impl InteractionMetadata {
    /// Derives the element signature used to group click events.
    ///
    /// Resolution priority: element id, then the first two class tokens,
    /// then the tag name, then `"unknown"`.
    pub fn element_signature(&self) -> String {
        if let Some(id) = self.element_id.as_deref().filter(|s| !s.is_empty()) {
            return format!("#{}", id);
        }
        if let Some(classes) = self.element_classes.as_deref() {
            let tokens: Vec<&str> = classes.split_whitespace().take(2).collect();
            if !tokens.is_empty() {
                return format!(".{}", tokens.join("."));
            }
        }
        if let Some(tag) = self.element_tag.as_deref().filter(|s| !s.is_empty()) {
            return tag.to_lowercase();
        }
        "unknown".to_string()
    }
}

/// A single stored interaction event. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique event ID.
    pub id: Uuid,
    /// Project partition key.
    pub project_id: String,
    /// Session this event belongs to.
    pub session_id: String,
    /// Optional user ID (None for anonymous traffic).
    pub user_id: Option<String>,
    /// Event type.
    pub event_type: EventType,
    /// Name for custom events (e.g. "add-to-cart").
    pub event_name: Option<String>,
    /// Full page URL where the event occurred.
    pub page_url: String,
    /// URL path (derived from `page_url` when the SDK omits it).
    pub path: String,
    /// Device class from upstream enrichment: desktop|mobile|tablet|unknown.
    pub device: String,
    /// Country code from upstream enrichment ("unknown" when absent).
    pub country: String,
    /// Referrer URL (empty when absent).
    pub referrer: String,
    /// Positional/element metadata.
    pub metadata: InteractionMetadata,
    /// Client event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Server receive timestamp.
    pub received_at: DateTime<Utc>,
}

impl Interaction {
    /// Derives the element signature for this event.
    pub fn element_signature(&self) -> String {
        self.metadata.element_signature()
    }

    /// Identity key for distinct-user counting: user id, falling back to the
    /// session id for anonymous traffic.
    pub fn identity(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.session_id)
    }

    /// Extracts the `utm_source` query parameter from the page URL, if any.
    pub fn utm_source(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.page_url).ok()?;
        parsed
            .query_pairs()
            .find(|(k, _)| k == "utm_source")
            .map(|(_, v)| v.into_owned())
    }
}

/// Extracts the path component from a URL, defaulting to "/".
pub fn extract_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| {
            // Relative form: take everything before query/fragment.
            let trimmed = url.split(['?', '#']).next().unwrap_or("/");
            if trimmed.starts_with('/') {
                trimmed.to_string()
            } else {
                "/".to_string()
            }
        })
}

/// Path prefixes excluded from tracking (admin surfaces and auth pages).
///
/// Events landing on these paths are accepted with a soft success and
/// silently dropped before any write.
pub const EXCLUDED_PATH_PREFIXES: &[&str] = &["/admin", "/login", "/dashboard"];

/// Returns true when the URL's path falls under an excluded prefix.
pub fn is_excluded_path(page_url: &str) -> bool {
    let path = extract_path(page_url);
    EXCLUDED_PATH_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}
