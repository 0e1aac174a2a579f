//! Query filter structs evaluated as in-process predicates.

use chrono::{DateTime, Utc};
use engine_core::{EventType, Interaction, SessionRecording, UrlPattern};
use serde::Serialize;

/// Page selection for interaction reads: a concrete URL (matched by path)
/// or a compiled pattern page.
#[derive(Debug, Clone)]
pub enum PageSelector {
    Exact(String),
    Pattern(UrlPattern),
}

impl PageSelector {
    pub fn matches(&self, interaction: &Interaction) -> bool {
        match self {
            Self::Exact(url) => {
                interaction.page_url == *url
                    || interaction.path == engine_core::extract_path(url)
            }
            Self::Pattern(pattern) => pattern.matches(&interaction.page_url),
        }
    }
}

/// Filters for interaction reads. All aggregation queries run over an
/// explicit bounded window.
#[derive(Debug, Clone)]
pub struct InteractionQuery {
    pub project_id: String,
    pub event_type: Option<EventType>,
    pub page: Option<PageSelector>,
    pub device: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl InteractionQuery {
    /// A query over everything in the project within the window.
    pub fn window(project_id: impl Into<String>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            project_id: project_id.into(),
            event_type: None,
            page: None,
            device: None,
            session_id: None,
            user_id: None,
            from,
            to,
        }
    }

    pub fn matches(&self, interaction: &Interaction) -> bool {
        if interaction.project_id != self.project_id {
            return false;
        }
        if interaction.timestamp < self.from || interaction.timestamp > self.to {
            return false;
        }
        if let Some(event_type) = self.event_type {
            if interaction.event_type != event_type {
                return false;
            }
        }
        if let Some(page) = &self.page {
            if !page.matches(interaction) {
                return false;
            }
        }
        if let Some(device) = &self.device {
            if interaction.device != *device {
                return false;
            }
        }
        if let Some(session_id) = &self.session_id {
            if interaction.session_id != *session_id {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if interaction.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Filters for the paginated session listing.
#[derive(Debug, Clone)]
pub struct SessionQuery {
    pub project_id: String,
    pub user_id: Option<String>,
    pub has_errors: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Substring match over any visited URL.
    pub url_contains: Option<String>,
    pub min_duration_secs: Option<i64>,
    pub device: Option<String>,
    /// Restrict to these session ids (used by the has-rage filter, which is
    /// resolved by the anomaly detector before the store query).
    pub session_ids: Option<Vec<String>>,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
}

impl SessionQuery {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: None,
            has_errors: None,
            from: None,
            to: None,
            url_contains: None,
            min_duration_secs: None,
            device: None,
            session_ids: None,
            page: 1,
            page_size: 20,
        }
    }

    pub fn matches(&self, session: &SessionRecording) -> bool {
        if session.project_id != self.project_id {
            return false;
        }
        if let Some(user_id) = &self.user_id {
            if session.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(has_errors) = self.has_errors {
            if session.has_errors() != has_errors {
                return false;
            }
        }
        if let Some(from) = self.from {
            if session.start_time < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if session.start_time > to {
                return false;
            }
        }
        if let Some(fragment) = &self.url_contains {
            if !session.pages_visited.iter().any(|u| u.contains(fragment.as_str())) {
                return false;
            }
        }
        if let Some(min) = self.min_duration_secs {
            if session.duration_secs.unwrap_or(0) < min {
                return false;
            }
        }
        if let Some(device) = &self.device {
            let session_device = session
                .device
                .as_ref()
                .and_then(|d| d.device_type.as_deref());
            if session_device != Some(device.as_str()) {
                return false;
            }
        }
        if let Some(ids) = &self.session_ids {
            if !ids.iter().any(|id| *id == session.session_id) {
                return false;
            }
        }
        true
    }
}

/// One page of the session listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPage {
    pub sessions: Vec<SessionRecording>,
    /// Total sessions matching the filters, before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}
