//! Plain-text status view: one line per quota plus a pace hint.
//!
//! ```text
//! ⚡ Claude Usage  ·  updated 5m ago
//! 🟡  Session:  60% remaining  ·  resets 3h 0m
//!     ↳ Burning a bit fast
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use quotapace_core::{assess_snapshot, PaceTier, QuotaKind, UsageConfig, UsageSnapshot};

/// Shown in place of a time when a quota has no reset
const NO_RESET: &str = "—";

/// Plain-text status view of a snapshot
pub struct StatusView;

impl StatusView {
    /// Render the whole view. `None` renders the no-data placeholder.
    pub fn render(
        snapshot: Option<&UsageSnapshot>,
        now: DateTime<Utc>,
        config: &UsageConfig,
    ) -> String {
        let Some(snapshot) = snapshot else {
            return Self::placeholder();
        };

        let mut lines = vec![format!(
            "⚡ Claude Usage  ·  updated {}",
            format_ago(snapshot.updated_at, now)
        )];

        for (kind, pacing) in assess_snapshot(snapshot, now, config) {
            lines.push(Self::quota_line(snapshot, kind, pacing.tier, now));
            lines.push(format!("    {}", hint_line(pacing.tier)));
        }

        lines.join("\n")
    }

    pub fn placeholder() -> String {
        "⚪  No usage data yet. Run `quotapace fetch` first.".to_string()
    }

    fn quota_line(
        snapshot: &UsageSnapshot,
        kind: QuotaKind,
        tier: PaceTier,
        now: DateTime<Utc>,
    ) -> String {
        let reading = snapshot.reading(kind);
        let resets = format_time_left(reading.reset_at, now);
        let figure = match kind {
            QuotaKind::Extra => format!(
                "${:.2} / ${:.2}",
                snapshot.extra.remaining_amount(),
                snapshot.extra.cap
            ),
            _ => format!("{}% remaining", reading.remaining_pct),
        };
        let label = match (kind, snapshot.weekly.detail.as_deref()) {
            (QuotaKind::Weekly, Some(detail)) if detail.contains(" only") => {
                format!("{} ({})", kind.label(), detail)
            }
            _ => kind.label().to_string(),
        };

        format!(
            "{}  {}:  {}  ·  resets {}",
            tier_marker(tier),
            label,
            figure,
            resets
        )
    }
}

/// Colored dot for a tier
pub fn tier_marker(tier: PaceTier) -> &'static str {
    match tier {
        PaceTier::Comfortable => "🟢",
        PaceTier::Watch => "🟡",
        PaceTier::SlowDown => "🟠",
        PaceTier::NearLimit => "🔴",
    }
}

pub fn tier_hint(tier: PaceTier) -> &'static str {
    match tier {
        PaceTier::Comfortable => "Comfortable pace",
        PaceTier::Watch => "Burning a bit fast",
        PaceTier::SlowDown => "Slow down to avoid hitting limit",
        PaceTier::NearLimit => "Near limit — conserve usage",
    }
}

fn hint_line(tier: PaceTier) -> String {
    match tier {
        PaceTier::NearLimit => format!("⚠️ {}", tier_hint(tier)),
        _ => format!("↳ {}", tier_hint(tier)),
    }
}

/// Compact time until `reset_at`: "now", "45m", "3h 12m", or whole days
/// past 48 hours
pub fn format_time_left(reset_at: Option<DateTime<FixedOffset>>, now: DateTime<Utc>) -> String {
    let Some(reset_at) = reset_at else {
        return NO_RESET.to_string();
    };
    let secs = (reset_at.with_timezone(&Utc) - now).num_seconds();
    if secs <= 0 {
        return "now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 48 {
        format!("{}d", hours / 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// How long ago `at` was: "just now", "5m ago", "2h 3m ago", "3d ago".
/// Times in the future count as just now.
pub fn format_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    if secs < 60 {
        return "just now".to_string();
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h {}m ago", hours, minutes % 60);
    }
    format!("{}d ago", hours / 24)
}
