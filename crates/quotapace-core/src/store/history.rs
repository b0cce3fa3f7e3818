//! Normalize history log lines into dashboard points.
//!
//! The log has held several record shapes over time (full snapshots keyed by
//! `updated_at`, older `ts`-keyed records with `used`/`limit` figures, and
//! event-only lines). Everything is read leniently and reduced to one shape.

use std::collections::BTreeMap;
use std::io::BufRead;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

/// One quota in a dashboard point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointQuota {
    pub remaining_pct: f64,
    pub used: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<String>,
}

/// Extra-usage figures in a dashboard point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraPoint {
    pub remaining_pct: f64,
    pub spent: f64,
    pub cap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<String>,
}

/// One normalized history entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub ts: DateTime<FixedOffset>,
    pub session: PointQuota,
    pub weekly: PointQuota,
    pub extra: ExtraPoint,
}

/// Normalize one history record. The timestamp is `ts`, or `updated_at` when
/// `ts` is missing, null or empty. Returns `None` for records without a
/// timestamp, event-only records, and records with neither a session nor a
/// weekly figure.
pub fn normalize_entry(entry: &Value) -> Option<HistoryPoint> {
    let ts = ["ts", "updated_at"]
        .into_iter()
        .filter_map(|key| entry.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())?;
    let ts = DateTime::parse_from_rfc3339(ts).ok()?;

    if entry.get("event").is_some() && entry.get("session").is_none() {
        return None;
    }

    let empty = Value::Null;
    let session = entry.get("session").unwrap_or(&empty);
    let weekly = entry.get("weekly").unwrap_or(&empty);
    let extra = entry.get("extra").unwrap_or(&empty);

    let session_remaining = remaining_pct(session);
    let weekly_remaining = remaining_pct(weekly);
    if session_remaining.is_none() && weekly_remaining.is_none() {
        return None;
    }

    Some(HistoryPoint {
        ts,
        session: PointQuota {
            remaining_pct: session_remaining.unwrap_or(100.0),
            used: number(session, "used").unwrap_or(0.0),
            reset_at: reset_at(session),
        },
        weekly: PointQuota {
            remaining_pct: weekly_remaining.unwrap_or(100.0),
            used: number(weekly, "used").unwrap_or(0.0),
            reset_at: reset_at(weekly),
        },
        extra: ExtraPoint {
            remaining_pct: remaining_pct(extra).unwrap_or(100.0),
            spent: number(extra, "spent").unwrap_or(0.0),
            cap: number(extra, "cap").unwrap_or(100.0),
            reset_at: reset_at(extra),
        },
    })
}

/// Read a history log into points, deduplicated by timestamp (first record
/// wins) and sorted oldest first. Unreadable or malformed lines are skipped.
pub fn load_history_points<R: BufRead>(reader: R) -> Vec<HistoryPoint> {
    let mut points: BTreeMap<DateTime<FixedOffset>, HistoryPoint> = BTreeMap::new();
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(point) = normalize_entry(&value) {
            points.entry(point.ts).or_insert(point);
        }
    }
    points.into_values().collect()
}

fn number(quota: &Value, key: &str) -> Option<f64> {
    quota.get(key).and_then(Value::as_f64)
}

/// `remaining_pct` as recorded, or derived from `used` / `limit`
fn remaining_pct(quota: &Value) -> Option<f64> {
    if let Some(remaining) = number(quota, "remaining_pct") {
        return Some(remaining);
    }
    let used = number(quota, "used")?;
    let limit = number(quota, "limit").filter(|l| *l > 0.0)?;
    Some((1.0 - used / limit).max(0.0) * 100.0)
}

fn reset_at(quota: &Value) -> Option<String> {
    quota
        .get("reset_at")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_snapshot_record() {
        let entry = json!({
            "session": {"used": 40, "remaining_pct": 60, "reset_at": "2026-02-05T17:00:00-08:00"},
            "weekly": {"used": 23, "remaining_pct": 77, "reset_at": null, "detail": "all models"},
            "extra": {"remaining_pct": 56, "spent": 22.22, "cap": 50.0, "reset_at": null},
            "updated_at": "2026-02-05T22:00:00Z",
            "source": "claude-cli/usage"
        });
        let point = normalize_entry(&entry).unwrap();
        assert_eq!(point.ts.to_rfc3339(), "2026-02-05T22:00:00+00:00");
        assert_eq!(point.session.remaining_pct, 60.0);
        assert_eq!(
            point.session.reset_at.as_deref(),
            Some("2026-02-05T17:00:00-08:00")
        );
        assert_eq!(point.weekly.reset_at, None);
        assert_eq!(point.extra.spent, 22.22);
        assert_eq!(point.extra.cap, 50.0);
    }

    #[test]
    fn test_normalize_legacy_used_limit_record() {
        let entry = json!({
            "ts": "2026-01-10T08:00:00.123456+00:00",
            "session": {"used": 30, "limit": 120},
            "weekly": {"time_remaining_pct": 40}
        });
        let point = normalize_entry(&entry).unwrap();
        assert_eq!(point.session.remaining_pct, 75.0);
        assert_eq!(point.session.used, 30.0);
        assert_eq!(point.weekly.remaining_pct, 100.0);
        assert_eq!(point.extra.remaining_pct, 100.0);
        assert_eq!(point.extra.cap, 100.0);
    }

    #[test]
    fn test_normalize_over_limit_clamps_to_zero() {
        let entry = json!({
            "ts": "2026-01-10T08:00:00Z",
            "session": {"used": 150, "limit": 100}
        });
        assert_eq!(normalize_entry(&entry).unwrap().session.remaining_pct, 0.0);
    }

    #[test]
    fn test_normalize_rejects_unusable_records() {
        assert!(normalize_entry(&json!({"session": {"remaining_pct": 10}})).is_none());
        assert!(normalize_entry(&json!({"ts": "", "session": {"remaining_pct": 10}})).is_none());
        assert!(normalize_entry(&json!({"ts": "yesterday", "session": {"remaining_pct": 10}})).is_none());
        assert!(normalize_entry(&json!({"ts": "2026-01-10T08:00:00Z", "event": "reset"})).is_none());
        assert!(normalize_entry(&json!({
            "ts": "2026-01-10T08:00:00Z",
            "extra": {"remaining_pct": 50}
        }))
        .is_none());
        assert!(normalize_entry(&json!({
            "ts": "2026-01-10T08:00:00Z",
            "session": {"used": 5, "limit": 0}
        }))
        .is_none());
    }

    #[test]
    fn test_normalize_falls_back_to_updated_at() {
        for ts in [json!(""), Value::Null] {
            let entry = json!({
                "ts": ts,
                "updated_at": "2026-01-10T08:00:00Z",
                "session": {"remaining_pct": 80}
            });
            let point = normalize_entry(&entry).unwrap();
            assert_eq!(point.ts.to_rfc3339(), "2026-01-10T08:00:00+00:00");
        }
    }

    #[test]
    fn test_load_history_points_dedups_and_sorts() {
        let log = r#"
{"ts": "2026-01-10T09:00:00Z", "session": {"remaining_pct": 50}}
not json
{"ts": "2026-01-10T08:00:00Z", "session": {"remaining_pct": 80}}
{"ts": "2026-01-10T09:00:00+00:00", "session": {"remaining_pct": 10}}
{"ts": "2026-01-10T10:00:00Z", "event": "reset"}
"#;
        let points = load_history_points(log.as_bytes());
        let remaining: Vec<f64> = points.iter().map(|p| p.session.remaining_pct).collect();
        assert_eq!(remaining, vec![80.0, 50.0]);
    }

    #[test]
    fn test_point_serialization_omits_missing_reset() {
        let entry = json!({"ts": "2026-01-10T08:00:00Z", "session": {"remaining_pct": 80}});
        let json = serde_json::to_value(normalize_entry(&entry).unwrap()).unwrap();
        assert_eq!(json["ts"], "2026-01-10T08:00:00Z");
        assert!(json["session"].get("reset_at").is_none());
        assert_eq!(json["weekly"]["remaining_pct"], 100.0);
    }
}
