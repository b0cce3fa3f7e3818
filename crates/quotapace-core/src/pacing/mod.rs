//! Quota pacing: score how fast a quota is being consumed against its window.
//!
//! The score compares the share of the window still to come with the share
//! of the quota still left. At 1.0 the quota runs out exactly at reset; above
//! 1.0 it runs out early. The share of the window still to come is floored
//! (see [`UsageConfig::late_window_floor`]) so a quota with little left right
//! before its reset flattens out instead of being flagged.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{TierThresholds, UsageConfig};
use crate::usage::{QuotaKind, QuotaReading, UsageSnapshot};

/// Elapsed fraction assumed when a quota has no reset time: the window has
/// just started, which yields the most cautious score for any usage level.
pub const NEUTRAL_ELAPSED_FRACTION: f64 = 0.0;

/// Discrete pace level, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceTier {
    Comfortable,
    Watch,
    SlowDown,
    NearLimit,
}

impl PaceTier {
    /// Bucket a score using the configured lower bounds
    pub fn from_score(score: f64, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.near_limit {
            PaceTier::NearLimit
        } else if score >= thresholds.slow_down {
            PaceTier::SlowDown
        } else if score >= thresholds.watch {
            PaceTier::Watch
        } else {
            PaceTier::Comfortable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaceTier::Comfortable => "comfortable",
            PaceTier::Watch => "watch",
            PaceTier::SlowDown => "slow down",
            PaceTier::NearLimit => "near limit",
        }
    }
}

/// Score and tier for one quota. Derived on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PacingResult {
    pub score: f64,
    pub tier: PaceTier,
}

/// Fraction of the window already elapsed, clamped to `[0, 1]`.
///
/// A missing reset time or an empty window yields
/// [`NEUTRAL_ELAPSED_FRACTION`].
pub fn elapsed_fraction(
    reset_at: Option<DateTime<FixedOffset>>,
    window: Duration,
    now: DateTime<Utc>,
) -> f64 {
    let Some(reset_at) = reset_at else {
        return NEUTRAL_ELAPSED_FRACTION;
    };
    let window_secs = window.num_seconds() as f64;
    if window_secs <= 0.0 {
        return NEUTRAL_ELAPSED_FRACTION;
    }
    let left_secs = (reset_at.with_timezone(&Utc) - now).num_seconds() as f64;
    (1.0 - left_secs / window_secs).clamp(0.0, 1.0)
}

/// Continuous urgency score for a quota.
///
/// `remaining_pct` is clamped to `[0, 100]` and `elapsed` to `[0, 1]`.
/// Non-increasing in `remaining_pct`, non-increasing in `elapsed`, and pure.
pub fn pace_score(remaining_pct: f64, elapsed: f64, config: &UsageConfig) -> f64 {
    let remaining = if remaining_pct.is_nan() {
        0.0
    } else {
        remaining_pct.clamp(0.0, 100.0)
    };
    let elapsed = if elapsed.is_finite() {
        elapsed.clamp(0.0, 1.0)
    } else {
        NEUTRAL_ELAPSED_FRACTION
    };
    let ceiling = config.thresholds.near_limit * 4.0;

    if remaining >= f64::from(config.fresh_remaining_pct) {
        return 0.0;
    }

    let time_left = (1.0 - elapsed).max(config.late_window_floor);
    let quota_left = remaining / 100.0;
    let score = if quota_left > 0.0 {
        (time_left / quota_left).min(ceiling)
    } else {
        ceiling
    };

    if remaining <= f64::from(config.exhausted_remaining_pct) {
        score.max(config.thresholds.near_limit)
    } else {
        score
    }
}

/// Score and tier for one quota at `now`
pub fn assess(reading: &QuotaReading, now: DateTime<Utc>, config: &UsageConfig) -> PacingResult {
    let elapsed = elapsed_fraction(reading.reset_at, config.window(reading.kind), now);
    let score = pace_score(f64::from(reading.remaining_pct), elapsed, config);
    PacingResult {
        score,
        tier: PaceTier::from_score(score, &config.thresholds),
    }
}

/// Pacing for all three quotas in display order
pub fn assess_snapshot(
    snapshot: &UsageSnapshot,
    now: DateTime<Utc>,
    config: &UsageConfig,
) -> [(QuotaKind, PacingResult); 3] {
    snapshot
        .readings()
        .map(|reading| (reading.kind, assess(&reading, now, config)))
}
