//! Grouped read-model summaries: interaction counts, scroll-depth
//! distribution, and top-clicked elements.

use std::collections::{HashMap, HashSet};

use engine_core::{EventType, Interaction};
use serde::Serialize;

/// Overview counts for a window.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionsSummary {
    pub total: u64,
    /// Counts per event type, descending.
    pub by_type: Vec<TypeCount>,
    pub unique_sessions: u64,
    pub unique_users: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    pub event_type: EventType,
    pub count: u64,
}

pub fn interactions_summary(interactions: &[Interaction]) -> InteractionsSummary {
    let mut by_type: HashMap<EventType, u64> = HashMap::new();
    let mut sessions: HashSet<&str> = HashSet::new();
    let mut users: HashSet<&str> = HashSet::new();

    for interaction in interactions {
        *by_type.entry(interaction.event_type).or_insert(0) += 1;
        sessions.insert(&interaction.session_id);
        if let Some(user) = interaction.user_id.as_deref() {
            users.insert(user);
        }
    }

    let mut by_type: Vec<TypeCount> = by_type
        .into_iter()
        .map(|(event_type, count)| TypeCount { event_type, count })
        .collect();
    by_type.sort_by(|a, b| b.count.cmp(&a.count));

    InteractionsSummary {
        total: interactions.len() as u64,
        by_type,
        unique_sessions: sessions.len() as u64,
        unique_users: users.len() as u64,
    }
}

/// One 25-percent scroll-depth bucket.
#[derive(Debug, Clone, Serialize)]
pub struct ScrollDepthBucket {
    /// e.g. "0-25%"
    pub range: String,
    pub count: u64,
}

/// Distribution of scroll events across four depth quartiles.
pub fn scroll_depth_distribution(interactions: &[Interaction]) -> Vec<ScrollDepthBucket> {
    let mut buckets = [0u64; 4];
    for interaction in interactions {
        if interaction.event_type != EventType::Scroll {
            continue;
        }
        if let Some(depth) = interaction.metadata.scroll_depth {
            let idx = ((depth.clamp(0.0, 100.0) / 25.0) as usize).min(3);
            buckets[idx] += 1;
        }
    }
    ["0-25%", "25-50%", "50-75%", "75-100%"]
        .iter()
        .zip(buckets)
        .map(|(range, count)| ScrollDepthBucket {
            range: range.to_string(),
            count,
        })
        .collect()
}

/// A clicked element ranked by volume.
#[derive(Debug, Clone, Serialize)]
pub struct TopClickedElement {
    pub element_signature: String,
    pub clicks: u64,
    pub sample_text: Option<String>,
}

/// Top clicked elements grouped by signature, descending by count.
pub fn top_clicked_elements(interactions: &[Interaction], limit: usize) -> Vec<TopClickedElement> {
    let mut groups: HashMap<String, (u64, Option<String>)> = HashMap::new();
    for interaction in interactions {
        if interaction.event_type != EventType::Click {
            continue;
        }
        let entry = groups
            .entry(interaction.element_signature())
            .or_insert((0, None));
        entry.0 += 1;
        if entry.1.is_none() {
            entry.1 = interaction.metadata.element_text.clone();
        }
    }

    let mut elements: Vec<TopClickedElement> = groups
        .into_iter()
        .map(|(signature, (clicks, sample_text))| TopClickedElement {
            element_signature: signature,
            clicks,
            sample_text,
        })
        .collect();
    elements.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    elements.truncate(limit);
    elements
}
