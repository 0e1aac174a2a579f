//! Funnel definitions and step/segment matching.
//!
//! A funnel is an immutable ordered list of steps. Each step matches
//! interactions by event type plus either a page URL or an element selector.
//! Analysis results are computed on demand and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::events::{extract_path, EventType, Interaction};

/// A stored funnel definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Funnel {
    pub id: Uuid,
    pub project_id: String,
    pub name: String,
    /// Ordered steps; at least two.
    pub steps: Vec<FunnelStep>,
    pub created_at: DateTime<Utc>,
}

/// One funnel step: an event-type matcher narrowed by page or element.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub event_type: EventType,
    /// Match by page: the interaction's path must equal this URL's path.
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    /// Match by element: the interaction's element signature must equal this.
    #[validate(length(max = 256))]
    pub element_selector: Option<String>,
}

impl FunnelStep {
    /// True when the interaction satisfies this step's criteria.
    pub fn matches(&self, interaction: &Interaction) -> bool {
        if interaction.event_type != self.event_type {
            return false;
        }
        if let Some(url) = &self.page_url {
            if interaction.path != extract_path(url) {
                return false;
            }
        }
        if let Some(selector) = &self.element_selector {
            if interaction.element_signature() != *selector {
                return false;
            }
        }
        true
    }
}

/// Request payload for creating a funnel.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FunnelDefinition {
    pub project_id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(nested)]
    pub steps: Vec<FunnelStep>,
}

impl FunnelDefinition {
    /// Validates and freezes the definition into a stored funnel.
    pub fn into_funnel(self) -> Result<Funnel> {
        self.validate()
            .map_err(|e| Error::validation(format!("{}", e)))?;
        if self.project_id.is_empty() {
            return Err(Error::missing_field("projectId"));
        }
        if self.steps.len() < 2 {
            return Err(Error::validation("a funnel needs at least two steps"));
        }
        for step in &self.steps {
            if step.page_url.is_none() && step.element_selector.is_none() {
                return Err(Error::validation(format!(
                    "step '{}' needs a pageUrl or elementSelector",
                    step.name
                )));
            }
        }
        Ok(Funnel {
            id: Uuid::new_v4(),
            project_id: self.project_id,
            name: self.name,
            steps: self.steps,
            created_at: Utc::now(),
        })
    }
}

/// Segment filters narrowing a funnel's filtered run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFilters {
    /// desktop | mobile | tablet
    pub device: Option<String>,
    pub country: Option<String>,
    /// Exact `utm_source` query-parameter value.
    pub utm_source: Option<String>,
    /// Substring match against the referrer URL.
    pub referrer_contains: Option<String>,
    /// Path prefix the interaction's path must start with.
    pub path_prefix: Option<String>,
}

impl SegmentFilters {
    pub fn is_empty(&self) -> bool {
        self.device.is_none()
            && self.country.is_none()
            && self.utm_source.is_none()
            && self.referrer_contains.is_none()
            && self.path_prefix.is_none()
    }

    /// True when the interaction falls inside this segment.
    pub fn matches(&self, interaction: &Interaction) -> bool {
        if let Some(device) = &self.device {
            if interaction.device != *device {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if interaction.country != *country {
                return false;
            }
        }
        if let Some(source) = &self.utm_source {
            if interaction.utm_source().as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        if let Some(fragment) = &self.referrer_contains {
            if !interaction.referrer.contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            if !interaction.path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}
