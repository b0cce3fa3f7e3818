//! Usage data types produced from Claude Code `/usage` output.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Source tag for snapshots scraped from the interactive CLI
pub const SOURCE_CLI_USAGE: &str = "claude-cli/usage";

/// The three tracked quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    /// Rolling 5-hour session window
    Session,
    /// Weekly window (all models)
    Weekly,
    /// Monthly extra-usage spend cap
    Extra,
}

impl QuotaKind {
    pub const ALL: [QuotaKind; 3] = [QuotaKind::Session, QuotaKind::Weekly, QuotaKind::Extra];

    /// Display name
    pub fn label(&self) -> &'static str {
        match self {
            QuotaKind::Session => "Session",
            QuotaKind::Weekly => "Weekly",
            QuotaKind::Extra => "Extra",
        }
    }
}

/// Outcome of looking for one quota block in the captured text.
///
/// Unmatched sections are not errors; the snapshot assembly step decides
/// what an absent block means.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionMatch<T> {
    Matched(T),
    Unmatched,
}

impl<T> SectionMatch<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, SectionMatch::Matched(_))
    }

    pub fn as_matched(&self) -> Option<&T> {
        match self {
            SectionMatch::Matched(value) => Some(value),
            SectionMatch::Unmatched => None,
        }
    }
}

/// Raw figures read from the "Current session" block
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReading {
    pub used: u8,
    pub reset_at: Option<DateTime<FixedOffset>>,
}

/// Raw figures read from the "Current week" blocks
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReading {
    pub used: u8,
    pub reset_at: Option<DateTime<FixedOffset>>,
}

/// Per-model weekly sub-quota (e.g. "Current week (Sonnet only)")
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReading {
    pub model: String,
    pub used: u8,
}

/// Raw figures read from the "Extra usage" block
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraReading {
    pub used: Option<u8>,
    /// `(spent, cap)` from a "$X / $Y" figure
    pub spending: Option<(f64, f64)>,
    pub reset_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionQuota {
    /// Percentage used (0-100)
    pub used: u8,
    pub remaining_pct: u8,
    pub reset_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyQuota {
    /// Percentage used across all models (0-100)
    pub used: u8,
    pub remaining_pct: u8,
    pub reset_at: Option<DateTime<FixedOffset>>,
    /// Which weekly figure this is, plus any per-model sub-quota
    /// (e.g. "all models · Sonnet only: 100% left")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraQuota {
    pub remaining_pct: u8,
    /// Dollars spent this cycle
    pub spent: f64,
    /// Monthly spend cap in dollars
    pub cap: f64,
    pub reset_at: Option<DateTime<FixedOffset>>,
}

impl ExtraQuota {
    /// Dollars left before the cap, never negative
    pub fn remaining_amount(&self) -> f64 {
        (self.cap - self.spent).max(0.0)
    }
}

/// Point-in-time record of all three quotas.
///
/// Built once per poll and never mutated; the pacing engine and the store
/// both take it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub session: SessionQuota,
    pub weekly: WeeklyQuota,
    pub extra: ExtraQuota,
    /// When the text this snapshot was built from was captured
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    SOURCE_CLI_USAGE.to_string()
}

/// Remaining percentage and reset time of one quota, the pacing engine's input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaReading {
    pub kind: QuotaKind,
    pub remaining_pct: u8,
    pub reset_at: Option<DateTime<FixedOffset>>,
}

impl UsageSnapshot {
    /// View one quota as a pacing input
    pub fn reading(&self, kind: QuotaKind) -> QuotaReading {
        let (remaining_pct, reset_at) = match kind {
            QuotaKind::Session => (self.session.remaining_pct, self.session.reset_at),
            QuotaKind::Weekly => (self.weekly.remaining_pct, self.weekly.reset_at),
            QuotaKind::Extra => (self.extra.remaining_pct, self.extra.reset_at),
        };
        QuotaReading {
            kind,
            remaining_pct,
            reset_at,
        }
    }

    /// All three quotas in display order
    pub fn readings(&self) -> [QuotaReading; 3] {
        QuotaKind::ALL.map(|kind| self.reading(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> UsageSnapshot {
        let pst = FixedOffset::west_opt(8 * 3600).unwrap();
        UsageSnapshot {
            session: SessionQuota {
                used: 40,
                remaining_pct: 60,
                reset_at: Some(pst.with_ymd_and_hms(2026, 2, 5, 17, 0, 0).unwrap()),
            },
            weekly: WeeklyQuota {
                used: 23,
                remaining_pct: 77,
                reset_at: None,
                detail: Some("all models".to_string()),
            },
            extra: ExtraQuota {
                remaining_pct: 56,
                spent: 22.22,
                cap: 50.0,
                reset_at: None,
            },
            updated_at: Utc.with_ymd_and_hms(2026, 2, 5, 22, 0, 0).unwrap(),
            source: SOURCE_CLI_USAGE.to_string(),
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["session"]["used"], 40);
        assert_eq!(json["session"]["remaining_pct"], 60);
        assert_eq!(json["session"]["reset_at"], "2026-02-05T17:00:00-08:00");
        assert_eq!(json["weekly"]["detail"], "all models");
        assert_eq!(json["extra"]["cap"], 50.0);
        assert!(json["extra"]["reset_at"].is_null());
        assert_eq!(json["updated_at"], "2026-02-05T22:00:00Z");
    }

    #[test]
    fn test_snapshot_json_roundtrip_without_source() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json.as_object_mut().unwrap().remove("source");
        let parsed: UsageSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_readings_order() {
        let kinds: Vec<QuotaKind> = sample().readings().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, QuotaKind::ALL.to_vec());
        assert_eq!(sample().reading(QuotaKind::Extra).remaining_pct, 56);
    }

    #[test]
    fn test_extra_remaining_amount() {
        let extra = ExtraQuota {
            remaining_pct: 0,
            spent: 60.0,
            cap: 50.0,
            reset_at: None,
        };
        assert_eq!(extra.remaining_amount(), 0.0);
        assert!((sample().extra.remaining_amount() - 27.78).abs() < 1e-9);
    }
}
