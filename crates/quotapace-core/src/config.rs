//! Immutable configuration shared by the extractor and the pacing engine.
//!
//! Loaded as the `[usage]` table of the host settings file; every field has a
//! default so an empty table is valid.

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::usage::QuotaKind;

/// Extraction and pacing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageConfig {
    /// UTC offset (hours) that reset phrases such as "Resets 4pm" are read in
    #[serde(default = "default_reset_utc_offset_hours")]
    pub reset_utc_offset_hours: i32,

    /// Nominal reset cycle of each quota
    #[serde(default)]
    pub windows: WindowSettings,

    /// Score boundaries between pace tiers
    #[serde(default)]
    pub thresholds: TierThresholds,

    /// Remaining percentage at or above which a quota is always comfortable
    #[serde(default = "default_fresh_remaining_pct")]
    pub fresh_remaining_pct: u8,

    /// Remaining percentage at or below which a quota is always near its limit
    #[serde(default = "default_exhausted_remaining_pct")]
    pub exhausted_remaining_pct: u8,

    /// Smallest fraction of the window treated as "time left" when scoring.
    /// Keeps the score flat instead of collapsing to zero right before a reset.
    #[serde(default = "default_late_window_floor")]
    pub late_window_floor: f64,
}

fn default_reset_utc_offset_hours() -> i32 {
    -8
}

fn default_fresh_remaining_pct() -> u8 {
    92
}

fn default_exhausted_remaining_pct() -> u8 {
    3
}

fn default_late_window_floor() -> f64 {
    0.05
}

/// Window durations in hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_session_hours")]
    pub session_hours: f64,

    #[serde(default = "default_weekly_hours")]
    pub weekly_hours: f64,

    /// Monthly spend cap, approximated as 30 days
    #[serde(default = "default_extra_hours")]
    pub extra_hours: f64,
}

fn default_session_hours() -> f64 {
    5.0
}

fn default_weekly_hours() -> f64 {
    168.0
}

fn default_extra_hours() -> f64 {
    720.0
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            session_hours: default_session_hours(),
            weekly_hours: default_weekly_hours(),
            extra_hours: default_extra_hours(),
        }
    }
}

/// Lower bounds (inclusive) of each tier above `Comfortable`.
///
/// A score of 1.0 means the quota is being consumed exactly as fast as its
/// window elapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(default = "default_watch")]
    pub watch: f64,

    #[serde(default = "default_slow_down")]
    pub slow_down: f64,

    #[serde(default = "default_near_limit")]
    pub near_limit: f64,
}

fn default_watch() -> f64 {
    0.95
}

fn default_slow_down() -> f64 {
    1.5
}

fn default_near_limit() -> f64 {
    3.0
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            watch: default_watch(),
            slow_down: default_slow_down(),
            near_limit: default_near_limit(),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            reset_utc_offset_hours: default_reset_utc_offset_hours(),
            windows: WindowSettings::default(),
            thresholds: TierThresholds::default(),
            fresh_remaining_pct: default_fresh_remaining_pct(),
            exhausted_remaining_pct: default_exhausted_remaining_pct(),
            late_window_floor: default_late_window_floor(),
        }
    }
}

impl UsageConfig {
    /// Offset that reset phrases are interpreted in
    pub fn reset_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.reset_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Nominal duration of a quota's window
    pub fn window(&self, kind: QuotaKind) -> Duration {
        let hours = match kind {
            QuotaKind::Session => self.windows.session_hours,
            QuotaKind::Weekly => self.windows.weekly_hours,
            QuotaKind::Extra => self.windows.extra_hours,
        };
        Duration::seconds((hours * 3600.0).round() as i64)
    }

    /// Repair out-of-range values in place, falling back to defaults.
    pub fn normalize(&mut self) {
        const MAX_WINDOW_HOURS: f64 = 24.0 * 366.0;

        if !(-23..=23).contains(&self.reset_utc_offset_hours) {
            warn!(
                "reset_utc_offset_hours {} out of range, using {}",
                self.reset_utc_offset_hours,
                default_reset_utc_offset_hours()
            );
            self.reset_utc_offset_hours = default_reset_utc_offset_hours();
        }

        let defaults = WindowSettings::default();
        for (hours, fallback, name) in [
            (&mut self.windows.session_hours, defaults.session_hours, "session"),
            (&mut self.windows.weekly_hours, defaults.weekly_hours, "weekly"),
            (&mut self.windows.extra_hours, defaults.extra_hours, "extra"),
        ] {
            if !hours.is_finite() || *hours <= 0.0 || *hours > MAX_WINDOW_HOURS {
                warn!("{} window of {}h is invalid, using {}h", name, hours, fallback);
                *hours = fallback;
            }
        }

        let t = &self.thresholds;
        let ordered = t.watch.is_finite()
            && t.near_limit.is_finite()
            && 0.0 < t.watch
            && t.watch <= t.slow_down
            && t.slow_down <= t.near_limit;
        if !ordered {
            warn!("tier thresholds {:?} are not ascending, using defaults", t);
            self.thresholds = TierThresholds::default();
        }

        if self.fresh_remaining_pct > 100 {
            self.fresh_remaining_pct = 100;
        }
        if self.exhausted_remaining_pct >= self.fresh_remaining_pct {
            warn!(
                "exhausted_remaining_pct {} must be below fresh_remaining_pct {}, using defaults",
                self.exhausted_remaining_pct, self.fresh_remaining_pct
            );
            self.fresh_remaining_pct = default_fresh_remaining_pct();
            self.exhausted_remaining_pct = default_exhausted_remaining_pct();
        }

        if !(0.0..1.0).contains(&self.late_window_floor) {
            self.late_window_floor = default_late_window_floor();
        }
    }
}
