use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use pretty_assertions::assert_eq;

use super::*;
use crate::config::UsageConfig;
use crate::error::UsageError;
use crate::pacing::{assess, PaceTier};

const FULL_OUTPUT: &str = r#"
 Settings:  Status   Config   Usage  (←/→ or tab to cycle)


  Current session
  ████████████████████████████████████               72% used
  Resets 1am (America/Los_Angeles)

  Current week (all models)
  ███████████▌                                       23% used
  Resets Mar 3, 12am (America/Los_Angeles)

  Current week (Sonnet only)
                                                     0% used

  Extra usage
  ██████████████████████▏                            44% used
  $22.22 / $50.00 spent · Resets Mar 1 (America/Los_Angeles)

  Esc to cancel
"#;

fn pst() -> FixedOffset {
    FixedOffset::west_opt(8 * 3600).unwrap()
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    pst()
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
    pst().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

#[test]
fn test_full_output() {
    let now = at(2026, 2, 20, 22, 0);
    let snapshot = extract_snapshot(FULL_OUTPUT, now, &UsageConfig::default()).unwrap();

    assert_eq!(
        snapshot.session,
        SessionQuota {
            used: 72,
            remaining_pct: 28,
            reset_at: Some(local(2026, 2, 21, 1, 0)),
        }
    );
    assert_eq!(
        snapshot.weekly,
        WeeklyQuota {
            used: 23,
            remaining_pct: 77,
            reset_at: Some(local(2026, 3, 3, 0, 0)),
            detail: Some("all models · Sonnet only: 100% left".to_string()),
        }
    );
    assert_eq!(
        snapshot.extra,
        ExtraQuota {
            remaining_pct: 56,
            spent: 22.22,
            cap: 50.0,
            reset_at: Some(local(2026, 3, 1, 0, 0)),
        }
    );
    assert_eq!(snapshot.updated_at, now);
    assert_eq!(snapshot.source, SOURCE_CLI_USAGE);
}

#[test]
fn test_extraction_sections_are_inspectable() {
    let now = at(2026, 2, 20, 22, 0);
    let extraction = extract(FULL_OUTPUT, now, &UsageConfig::default());

    assert!(extraction.session.is_matched());
    assert!(extraction.weekly.is_matched());
    assert_eq!(
        extraction.weekly_model,
        SectionMatch::Matched(ModelReading {
            model: "Sonnet".to_string(),
            used: 0,
        })
    );
    let extra = extraction.extra.as_matched().unwrap();
    assert_eq!(extra.used, Some(44));
    assert_eq!(extra.spending, Some((22.22, 50.0)));
}

#[test]
fn test_session_only_defaults_other_quotas() {
    let text = "  Current session\n  ███      15% used\n  Resets 5pm\n";
    let now = at(2026, 2, 5, 14, 0);
    let extraction = extract(text, now, &UsageConfig::default());
    assert_eq!(extraction.weekly, SectionMatch::Unmatched);
    assert_eq!(extraction.extra, SectionMatch::Unmatched);

    let snapshot = extraction.into_snapshot(&UsageConfig::default()).unwrap();
    assert_eq!(snapshot.session.remaining_pct, 85);
    assert_eq!(snapshot.weekly.remaining_pct, 100);
    assert_eq!(snapshot.weekly.reset_at, None);
    assert_eq!(snapshot.weekly.detail, None);
    assert_eq!(snapshot.extra.remaining_pct, 100);
    assert_eq!((snapshot.extra.spent, snapshot.extra.cap), (0.0, 100.0));
    assert_eq!(snapshot.extra.reset_at, None);
}

#[test]
fn test_extraction_is_idempotent() {
    let now = at(2026, 2, 20, 22, 0);
    let config = UsageConfig::default();
    let first = extract_snapshot(FULL_OUTPUT, now, &config).unwrap();
    let second = extract_snapshot(FULL_OUTPUT, now, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_end_to_end_session_scenario() {
    let text = "Current session ... 40% used ... Resets 5pm";
    let now = at(2026, 2, 5, 14, 0);
    let config = UsageConfig::default();
    let snapshot = extract_snapshot(text, now, &config).unwrap();

    assert_eq!(snapshot.session.used, 40);
    assert_eq!(snapshot.session.remaining_pct, 60);
    assert_eq!(snapshot.session.reset_at, Some(local(2026, 2, 5, 17, 0)));

    let pace = assess(&snapshot.reading(QuotaKind::Session), now, &config);
    assert!(
        pace.tier <= PaceTier::Watch,
        "expected comfortable or watch, got {:?} (score {})",
        pace.tier,
        pace.score
    );
}

#[test]
fn test_no_quota_is_an_error() {
    let now = at(2026, 2, 5, 14, 0);
    let config = UsageConfig::default();

    let extraction = extract("claude> /usage\nLoading...", now, &config);
    assert!(extraction.is_empty());
    assert!(matches!(
        extraction.into_snapshot(&config),
        Err(UsageError::NoQuotaMatched)
    ));
    assert!(matches!(
        extract_snapshot("", now, &config),
        Err(UsageError::NoQuotaMatched)
    ));
}

#[test]
fn test_label_without_figures_is_unmatched() {
    let text = "Current session\n  Resets 5pm\n\nCurrent week (all models)\n  10% used\n";
    let now = at(2026, 2, 5, 14, 0);
    let extraction = extract(text, now, &UsageConfig::default());
    assert_eq!(extraction.session, SectionMatch::Unmatched);
    assert!(extraction.weekly.is_matched());

    let snapshot = extraction.into_snapshot(&UsageConfig::default()).unwrap();
    assert_eq!(snapshot.session.remaining_pct, 100);
    assert_eq!(snapshot.session.reset_at, None);
    assert_eq!(snapshot.weekly.remaining_pct, 90);
}

#[test]
fn test_first_occurrence_wins() {
    let text = "\
Current session
  30% used
  Resets 5pm

Current session
  90% used
  Resets 7pm
";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.session.used, 30);
    assert_eq!(snapshot.session.reset_at, Some(local(2026, 2, 5, 17, 0)));
}

#[test]
fn test_reset_is_not_borrowed_from_next_block() {
    let text = "\
Current session
  ██   12% used

Current week (all models)
  ██   50% used
  Resets Feb 9 at 8am
";
    let now = at(2026, 2, 5, 14, 0);
    let extraction = extract(text, now, &UsageConfig::default());
    let session = extraction.session.as_matched().unwrap();
    assert_eq!(session.reset_at, None);
    let weekly = extraction.weekly.as_matched().unwrap();
    assert_eq!(weekly.reset_at, Some(local(2026, 2, 9, 8, 0)));
}

#[test]
fn test_session_without_reset_falls_back_to_window() {
    let text = "Current session\n  12% used\n  Resets whenever\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.session.reset_at, Some(local(2026, 2, 5, 19, 0)));
}

#[test]
fn test_weekly_without_reset_stays_empty() {
    let text = "Current week (all models)\n  12% used\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.weekly.reset_at, None);
    assert_eq!(snapshot.weekly.detail.as_deref(), Some("all models"));
}

#[test]
fn test_model_quota_alone_does_not_count() {
    let text = "Current week (Opus only)\n  35% used\n";
    let now = at(2026, 2, 5, 14, 0);
    let extraction = extract(text, now, &UsageConfig::default());
    assert!(extraction.weekly_model.is_matched());
    assert!(extraction.is_empty());
}

#[test]
fn test_model_quota_detail_without_weekly() {
    let text = "Current session\n 5% used\nCurrent week (Opus only)\n  35% used\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.weekly.remaining_pct, 100);
    assert_eq!(snapshot.weekly.detail.as_deref(), Some("Opus only: 65% left"));
}

#[test]
fn test_extra_spending_overrides_percent() {
    let text = "Extra usage\n  10% used\n  $30.00 / $40.00 spent · Resets Mar 1\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.extra.remaining_pct, 25);
    assert_eq!((snapshot.extra.spent, snapshot.extra.cap), (30.0, 40.0));
}

#[test]
fn test_extra_percent_without_spending() {
    let text = "Extra usage\n  ████ 44% used\n  Resets Mar 1\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.extra.remaining_pct, 56);
    assert_eq!((snapshot.extra.spent, snapshot.extra.cap), (0.0, 100.0));
    assert_eq!(snapshot.extra.reset_at, Some(local(2026, 3, 1, 0, 0)));
}

#[test]
fn test_extra_overspent_is_clamped() {
    let text = "Extra usage\n  $1,250.00 / $1,000.00 spent\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.extra.remaining_pct, 0);
    assert_eq!(snapshot.extra.spent, 1250.0);
    assert_eq!(snapshot.extra.cap, 1000.0);
}

#[test]
fn test_extra_zero_cap_uses_percent() {
    let text = "Extra usage\n  20% used\n  $0.00 / $0.00 spent\n";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.extra.remaining_pct, 80);
}

#[test]
fn test_extra_not_enabled_is_unmatched() {
    let text = "Current session\n 5% used\n\nExtra usage not enabled · /extra-usage to enable\n";
    let now = at(2026, 2, 5, 14, 0);
    let extraction = extract(text, now, &UsageConfig::default());
    assert_eq!(extraction.extra, SectionMatch::Unmatched);
}

#[test]
fn test_boxed_and_colored_output() {
    let text = "\
╭──────────────────────────────────────────────╮
│ \x1b[1mCurrent session\x1b[0m                              │
│ \x1b[32m█████\x1b[0m                          8% used      │
│ Resets 11pm (America/Los_Angeles)            │
╰──────────────────────────────────────────────╯
";
    let now = at(2026, 2, 5, 14, 0);
    let snapshot = extract_snapshot(text, now, &UsageConfig::default()).unwrap();
    assert_eq!(snapshot.session.used, 8);
    assert_eq!(snapshot.session.reset_at, Some(local(2026, 2, 5, 23, 0)));
}

#[test]
fn test_reference_offset_follows_config() {
    let config = UsageConfig {
        reset_utc_offset_hours: 9,
        ..UsageConfig::default()
    };
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let now = tokyo
        .with_ymd_and_hms(2026, 2, 5, 14, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let snapshot = extract_snapshot("Current session 1% used Resets 5pm", now, &config).unwrap();
    assert_eq!(
        snapshot.session.reset_at,
        Some(tokyo.with_ymd_and_hms(2026, 2, 5, 17, 0, 0).unwrap())
    );
}

#[test]
fn test_decimal_percent_is_read_whole() {
    let now = at(2026, 2, 5, 14, 0);
    let config = UsageConfig::default();

    let snapshot =
        extract_snapshot("Current session\n  12.5% used\n  Resets 5pm\n", now, &config).unwrap();
    assert_eq!(snapshot.session.used, 13);
    assert_eq!(snapshot.session.remaining_pct, 87);

    let snapshot =
        extract_snapshot("Current session\n  40.2% used\n  Resets 5pm\n", now, &config).unwrap();
    assert_eq!(snapshot.session.used, 40);
}
