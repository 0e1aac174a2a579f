//! Heatmap point-cloud generation with a read-through cache.
//!
//! Click and hover points snap to a 10-pixel grid; scroll depth buckets into
//! 5% rows. Snapshots are cached per `(page, type, device)` for one hour
//! unless the caller forces regeneration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_core::{EventType, Interaction, Result};
use moka::future::Cache;
use serde::{Deserialize, Serialize};

/// Cache TTL: snapshots older than this are regenerated.
pub const HEATMAP_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Maximum cached snapshots.
const HEATMAP_CACHE_MAX_CAPACITY: u64 = 1_000;

/// Pixel grid for click/hover point snapping.
const GRID_PX: f64 = 10.0;

/// Depth bucket for scroll rows, in percent.
const SCROLL_ROW_PCT: f64 = 5.0;

/// Kinds of heatmaps the engine can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapType {
    Click,
    Hover,
    Scroll,
}

impl HeatmapType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "click" => Some(Self::Click),
            "hover" => Some(Self::Hover),
            "scroll" => Some(Self::Scroll),
            _ => None,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Click => EventType::Click,
            Self::Hover => EventType::Hover,
            Self::Scroll => EventType::Scroll,
        }
    }
}

/// One weighted point in the cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: f64,
    pub y: f64,
    pub value: u64,
}

/// A generated heatmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapSnapshot {
    pub points: Vec<HeatmapPoint>,
    pub total_interactions: u64,
    pub unique_users: u64,
    pub generated_at: DateTime<Utc>,
}

/// Cache key: window bounds are deliberately excluded, matching the
/// one-entry-per-page semantics of the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeatmapKey {
    pub project_id: String,
    pub page: String,
    pub heatmap_type: HeatmapType,
    pub device: Option<String>,
}

/// Builds the point cloud from raw interactions of the matching event type.
pub fn generate_heatmap(interactions: &[Interaction], heatmap_type: HeatmapType) -> HeatmapSnapshot {
    let mut cells: HashMap<(i64, i64), u64> = HashMap::new();
    let mut users: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut total = 0u64;

    for interaction in interactions {
        if interaction.event_type != heatmap_type.event_type() {
            continue;
        }
        let cell = match heatmap_type {
            HeatmapType::Click | HeatmapType::Hover => {
                let (Some(x), Some(y)) = (interaction.metadata.x, interaction.metadata.y) else {
                    continue;
                };
                (
                    (x / GRID_PX).floor() as i64,
                    (y / GRID_PX).floor() as i64,
                )
            }
            HeatmapType::Scroll => {
                let Some(depth) = interaction.metadata.scroll_depth else {
                    continue;
                };
                (0, (depth.clamp(0.0, 100.0) / SCROLL_ROW_PCT).floor() as i64)
            }
        };
        *cells.entry(cell).or_insert(0) += 1;
        users.insert(interaction.identity());
        total += 1;
    }

    let mut points: Vec<HeatmapPoint> = cells
        .into_iter()
        .map(|((cx, cy), value)| match heatmap_type {
            HeatmapType::Click | HeatmapType::Hover => HeatmapPoint {
                x: cx as f64 * GRID_PX,
                y: cy as f64 * GRID_PX,
                value,
            },
            HeatmapType::Scroll => HeatmapPoint {
                x: 0.0,
                y: cy as f64 * SCROLL_ROW_PCT,
                value,
            },
        })
        .collect();
    points.sort_by(|a, b| (a.y, a.x).partial_cmp(&(b.y, b.x)).unwrap_or(std::cmp::Ordering::Equal));

    HeatmapSnapshot {
        points,
        total_interactions: total,
        unique_users: users.len() as u64,
        generated_at: Utc::now(),
    }
}

/// Raw (ungrouped) points for the overlay debugger. Bypasses the cache.
pub fn raw_points(interactions: &[Interaction], heatmap_type: HeatmapType) -> Vec<HeatmapPoint> {
    interactions
        .iter()
        .filter(|i| i.event_type == heatmap_type.event_type())
        .filter_map(|i| match heatmap_type {
            HeatmapType::Click | HeatmapType::Hover => match (i.metadata.x, i.metadata.y) {
                (Some(x), Some(y)) => Some(HeatmapPoint { x, y, value: 1 }),
                _ => None,
            },
            HeatmapType::Scroll => i.metadata.scroll_depth.map(|depth| HeatmapPoint {
                x: 0.0,
                y: depth,
                value: 1,
            }),
        })
        .collect()
}

/// Read-through snapshot cache.
pub struct HeatmapCache {
    cache: Cache<HeatmapKey, Arc<HeatmapSnapshot>>,
}

impl Default for HeatmapCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HeatmapCache {
    pub fn new() -> Self {
        Self::with_ttl(HEATMAP_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(HEATMAP_CACHE_MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Returns the cached snapshot when fresh, otherwise runs `load`,
    /// overwrites the entry, and returns the new snapshot. `regenerate=true`
    /// always recomputes.
    pub async fn get_or_generate<F, Fut>(
        &self,
        key: HeatmapKey,
        regenerate: bool,
        load: F,
    ) -> Result<Arc<HeatmapSnapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HeatmapSnapshot>>,
    {
        if !regenerate {
            if let Some(cached) = self.cache.get(&key).await {
                return Ok(cached);
            }
        }
        let snapshot = Arc::new(load().await?);
        self.cache.insert(key, snapshot.clone()).await;
        Ok(snapshot)
    }

    /// Drops every cached snapshot.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
