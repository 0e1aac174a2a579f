//! Attention-band aggregation over the vertical viewport.
//!
//! The viewport is split into N equal bands. Scroll hits come from
//! `scroll_depth`, click hits from the normalized `y_percent` position.
//! The composite score weights scroll reach over click density.

use engine_core::{EventType, Interaction};
use serde::Serialize;

/// Default number of vertical bands.
pub const DEFAULT_BANDS: usize = 8;

/// Scroll weight in the composite score.
const SCROLL_WEIGHT: f64 = 0.6;

/// Click weight in the composite score.
const CLICK_WEIGHT: f64 = 0.4;

/// One vertical viewport band.
#[derive(Debug, Clone, Serialize)]
pub struct AttentionBand {
    pub index: usize,
    /// Inclusive start of the band, percent of viewport height.
    pub start_percent: f64,
    /// Exclusive end (the last band includes 100).
    pub end_percent: f64,
    pub scroll_hits: u64,
    pub click_hits: u64,
    /// `0.6 × norm(scroll) + 0.4 × norm(click)`, max-normalized across bands.
    pub score: f64,
}

/// Share of activity landing in bands that start at or below the fold.
#[derive(Debug, Clone, Serialize)]
pub struct BelowTheFold {
    pub scroll_percent: f64,
    pub click_percent: f64,
}

/// Full attention report for a page window.
#[derive(Debug, Clone, Serialize)]
pub struct AttentionReport {
    pub bands: Vec<AttentionBand>,
    pub below_the_fold: BelowTheFold,
}

/// Computes the attention report over raw interactions.
pub fn attention_bands(interactions: &[Interaction], band_count: usize) -> AttentionReport {
    let band_count = band_count.clamp(2, 40);
    let band_height = 100.0 / band_count as f64;

    let mut scroll_hits = vec![0u64; band_count];
    let mut click_hits = vec![0u64; band_count];

    let band_of = |percent: f64| -> usize {
        ((percent.clamp(0.0, 100.0) / band_height) as usize).min(band_count - 1)
    };

    for interaction in interactions {
        match interaction.event_type {
            EventType::Scroll => {
                if let Some(depth) = interaction.metadata.scroll_depth {
                    scroll_hits[band_of(depth)] += 1;
                }
            }
            EventType::Click => {
                if let Some(y) = interaction.metadata.y_percent {
                    click_hits[band_of(y)] += 1;
                }
            }
            _ => {}
        }
    }

    let max_scroll = scroll_hits.iter().copied().max().unwrap_or(0);
    let max_click = click_hits.iter().copied().max().unwrap_or(0);
    let norm = |hits: u64, max: u64| {
        if max == 0 {
            0.0
        } else {
            hits as f64 / max as f64
        }
    };

    let bands: Vec<AttentionBand> = (0..band_count)
        .map(|i| AttentionBand {
            index: i,
            start_percent: i as f64 * band_height,
            end_percent: (i + 1) as f64 * band_height,
            scroll_hits: scroll_hits[i],
            click_hits: click_hits[i],
            score: SCROLL_WEIGHT * norm(scroll_hits[i], max_scroll)
                + CLICK_WEIGHT * norm(click_hits[i], max_click),
        })
        .collect();

    let total_scroll: u64 = scroll_hits.iter().sum();
    let total_click: u64 = click_hits.iter().sum();
    let fold_share = |hits: &[u64], total: u64| {
        if total == 0 {
            return 0.0;
        }
        let below: u64 = bands
            .iter()
            .filter(|b| b.start_percent >= 50.0)
            .map(|b| hits[b.index])
            .sum();
        below as f64 / total as f64 * 100.0
    };

    AttentionReport {
        below_the_fold: BelowTheFold {
            scroll_percent: fold_share(&scroll_hits, total_scroll),
            click_percent: fold_share(&click_hits, total_click),
        },
        bands,
    }
}
