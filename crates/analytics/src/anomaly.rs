//! Rage-click and dead-click detection.
//!
//! Both detectors run over an explicit bounded window of persisted
//! interactions: O(n log n) per session for the sort, then a linear scan.
//! Incidents are ephemeral query results and never persisted.

use std::collections::HashMap;
use std::sync::LazyLock;

use engine_core::{EventType, Interaction};
use regex::Regex;
use serde::Serialize;

/// Default rage window in milliseconds.
pub const DEFAULT_RAGE_WINDOW_MS: i64 = 3000;

/// Default clicks within the window to flag a rage burst.
pub const DEFAULT_RAGE_THRESHOLD: usize = 3;

/// Default dead-click idle horizon in milliseconds.
pub const DEFAULT_DEAD_IDLE_MS: i64 = 2000;

/// Custom-event actions that count as a reaction to a click.
static REACTION_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)navigate|open|success").expect("static regex"));

/// One detected burst or dead click inside a single session.
#[derive(Debug, Clone)]
struct Incident {
    session_id: String,
    page_url: String,
    signature: String,
    clicks: u64,
    x_sum: f64,
    y_sum: f64,
    coord_count: u64,
    sample_text: Option<String>,
}

/// Cross-session rollup keyed by `(page_url, element_signature)`.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRollup {
    pub page_url: String,
    pub element_signature: String,
    pub incident_count: u64,
    pub total_clicks: u64,
    pub sessions_affected: u64,
    /// Sample mean click position, when coordinates were present.
    pub avg_x: Option<f64>,
    pub avg_y: Option<f64>,
    pub sample_text: Option<String>,
}

fn roll_up(incidents: Vec<Incident>) -> Vec<AnomalyRollup> {
    struct Acc {
        incident_count: u64,
        total_clicks: u64,
        sessions: std::collections::HashSet<String>,
        x_sum: f64,
        y_sum: f64,
        coord_count: u64,
        sample_text: Option<String>,
    }

    let mut groups: HashMap<(String, String), Acc> = HashMap::new();
    for incident in incidents {
        let acc = groups
            .entry((incident.page_url.clone(), incident.signature.clone()))
            .or_insert_with(|| Acc {
                incident_count: 0,
                total_clicks: 0,
                sessions: Default::default(),
                x_sum: 0.0,
                y_sum: 0.0,
                coord_count: 0,
                sample_text: None,
            });
        acc.incident_count += 1;
        acc.total_clicks += incident.clicks;
        acc.sessions.insert(incident.session_id);
        acc.x_sum += incident.x_sum;
        acc.y_sum += incident.y_sum;
        acc.coord_count += incident.coord_count;
        if acc.sample_text.is_none() {
            acc.sample_text = incident.sample_text;
        }
    }

    let mut rollups: Vec<AnomalyRollup> = groups
        .into_iter()
        .map(|((page_url, signature), acc)| AnomalyRollup {
            page_url,
            element_signature: signature,
            incident_count: acc.incident_count,
            total_clicks: acc.total_clicks,
            sessions_affected: acc.sessions.len() as u64,
            avg_x: (acc.coord_count > 0).then(|| acc.x_sum / acc.coord_count as f64),
            avg_y: (acc.coord_count > 0).then(|| acc.y_sum / acc.coord_count as f64),
            sample_text: acc.sample_text,
        })
        .collect();

    // Rank by incident count, then total click volume.
    rollups.sort_by(|a, b| {
        (b.incident_count, b.total_clicks).cmp(&(a.incident_count, a.total_clicks))
    });
    rollups
}

fn incident_from_cluster(cluster: &[&Interaction]) -> Incident {
    let first = cluster[0];
    let mut x_sum = 0.0;
    let mut y_sum = 0.0;
    let mut coord_count = 0;
    let mut sample_text = None;
    for click in cluster {
        if let (Some(x), Some(y)) = (click.metadata.x, click.metadata.y) {
            x_sum += x;
            y_sum += y;
            coord_count += 1;
        }
        if sample_text.is_none() {
            sample_text = click.metadata.element_text.clone();
        }
    }
    Incident {
        session_id: first.session_id.clone(),
        page_url: first.page_url.clone(),
        signature: first.element_signature(),
        clicks: cluster.len() as u64,
        x_sum,
        y_sum,
        coord_count,
        sample_text,
    }
}

/// Detects rage-click bursts.
///
/// Clicks are grouped by `(session, page, signature)` and sorted by
/// timestamp. A window of `window_ms` slides over each group; whenever it
/// holds at least `threshold` clicks, one incident covers the whole cluster
/// and the window advances past it, so a single burst never yields
/// overlapping incidents.
pub fn detect_rage_clicks(
    interactions: &[Interaction],
    window_ms: i64,
    threshold: usize,
) -> Vec<AnomalyRollup> {
    roll_up(rage_incidents(interactions, window_ms, threshold))
}

/// Session ids containing at least one rage burst. Drives the session
/// listing's has-rage filter.
pub fn rage_click_sessions(
    interactions: &[Interaction],
    window_ms: i64,
    threshold: usize,
) -> Vec<String> {
    let mut ids: Vec<String> = rage_incidents(interactions, window_ms, threshold)
        .into_iter()
        .map(|i| i.session_id)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

fn rage_incidents(interactions: &[Interaction], window_ms: i64, threshold: usize) -> Vec<Incident> {
    let mut groups: HashMap<(&str, &str, String), Vec<&Interaction>> = HashMap::new();
    for interaction in interactions {
        if interaction.event_type != EventType::Click {
            continue;
        }
        groups
            .entry((
                &interaction.session_id,
                &interaction.page_url,
                interaction.element_signature(),
            ))
            .or_default()
            .push(interaction);
    }

    let threshold = threshold.max(2);
    let mut incidents = Vec::new();
    for clicks in groups.values_mut() {
        clicks.sort_by_key(|c| c.timestamp);
        let n = clicks.len();
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n
                && (clicks[j + 1].timestamp - clicks[i].timestamp).num_milliseconds() <= window_ms
            {
                j += 1;
            }
            if j - i + 1 >= threshold {
                incidents.push(incident_from_cluster(&clicks[i..=j]));
                i = j + 1;
            } else {
                i += 1;
            }
        }
    }

    incidents
}

/// True when `event` counts as a reaction to a click on `signature`.
fn is_reaction(event: &Interaction, signature: &str) -> bool {
    match event.event_type {
        EventType::Pageview => true,
        // A click landing on a different element means the user progressed.
        EventType::Click => event.element_signature() != signature,
        EventType::Custom => {
            event.event_name.as_deref() == Some("submit")
                || event
                    .metadata
                    .action
                    .as_deref()
                    .is_some_and(|a| REACTION_ACTION.is_match(a))
        }
        _ => event.event_name.as_deref() == Some("submit"),
    }
}

/// Detects dead clicks: clicks with no observable reaction within `idle_ms`
/// in the same session's chronological stream.
pub fn detect_dead_clicks(interactions: &[Interaction], idle_ms: i64) -> Vec<AnomalyRollup> {
    let mut sessions: HashMap<&str, Vec<&Interaction>> = HashMap::new();
    for interaction in interactions {
        sessions
            .entry(&interaction.session_id)
            .or_default()
            .push(interaction);
    }

    let mut incidents = Vec::new();
    for stream in sessions.values_mut() {
        stream.sort_by_key(|i| i.timestamp);
        for (idx, click) in stream.iter().enumerate() {
            if click.event_type != EventType::Click {
                continue;
            }
            let signature = click.element_signature();
            let deadline = click.timestamp + chrono::Duration::milliseconds(idle_ms);

            let reacted = stream[idx + 1..]
                .iter()
                .take_while(|e| e.timestamp <= deadline)
                .any(|e| is_reaction(e, &signature));

            if !reacted {
                incidents.push(incident_from_cluster(&[click]));
            }
        }
    }

    roll_up(incidents)
}
