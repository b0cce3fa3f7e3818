//! Extract quota figures from captured Claude Code `/usage` output.
//!
//! Expected format (each meter block):
//! ```text
//!   Current session
//!   ████████████████████████████████████               72% used
//!   Resets 1am (America/Los_Angeles)
//!
//!   Current week (all models)
//!   ███████████▌                                       23% used
//!   Resets Mar 3, 12am (America/Los_Angeles)
//!
//!   Current week (Sonnet only)
//!                                                      0% used
//!
//!   Extra usage
//!   ██████████████████████▏                            44% used
//!   $22.22 / $50.00 spent · Resets Mar 1 (America/Los_Angeles)
//! ```
//!
//! Layout is not relied on: each block starts at its label and runs until the
//! next recognised label, and anything between the label and its figures
//! (bars, borders, padding) is skipped. Only the first occurrence of each
//! label is used.

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::reset::ResetResolver;
use super::types::{
    ExtraQuota, ExtraReading, ModelReading, SectionMatch, SessionQuota, SessionReading,
    UsageSnapshot, WeeklyQuota, WeeklyReading, SOURCE_CLI_USAGE,
};
use super::QuotaKind;
use crate::config::UsageConfig;
use crate::error::UsageError;

static SESSION_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)current\s+session").expect("Invalid SESSION_ANCHOR regex"));

static WEEKLY_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)current\s+week\s*\(\s*all\s+models\s*\)").expect("Invalid WEEKLY_ANCHOR regex")
});

/// "Current week (Sonnet only)", "Current week (Opus only)"
static MODEL_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)current\s+week\s*\(\s*([a-z0-9][a-z0-9 .\-]*?)\s+only\s*\)")
        .expect("Invalid MODEL_ANCHOR regex")
});

static EXTRA_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)extra\s+usage").expect("Invalid EXTRA_ANCHOR regex"));

static PERCENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\d.])(\d{1,3}(?:\.\d+)?)\s*%\s*used")
        .expect("Invalid PERCENT_PATTERN regex")
});

static RESET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bresets\b[^\n]*").expect("Invalid RESET_PATTERN regex"));

/// "$22.22 / $50.00"
static SPENDING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\s*(\d[\d,]*(?:\.\d+)?)\s*/\s*\$\s*(\d[\d,]*(?:\.\d+)?)")
        .expect("Invalid SPENDING_PATTERN regex")
});

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("Invalid ANSI_ESCAPE regex")
});

/// Per-section results of scanning one capture, before defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub session: SectionMatch<SessionReading>,
    pub weekly: SectionMatch<WeeklyReading>,
    /// Per-model weekly sub-quota, reported only as weekly detail
    pub weekly_model: SectionMatch<ModelReading>,
    pub extra: SectionMatch<ExtraReading>,
    pub captured_at: DateTime<Utc>,
}

impl Extraction {
    /// True when none of the three quotas was found
    pub fn is_empty(&self) -> bool {
        !self.session.is_matched() && !self.weekly.is_matched() && !self.extra.is_matched()
    }

    /// Assemble the snapshot, defaulting unmatched quotas to 100% remaining.
    ///
    /// Fails only when no quota matched at all.
    pub fn into_snapshot(self, config: &UsageConfig) -> Result<UsageSnapshot, UsageError> {
        if self.is_empty() {
            return Err(UsageError::NoQuotaMatched);
        }

        let offset = config.reset_offset();
        let session = match self.session {
            SectionMatch::Matched(reading) => SessionQuota {
                used: reading.used,
                remaining_pct: 100 - reading.used,
                reset_at: Some(reading.reset_at.unwrap_or_else(|| {
                    (self.captured_at + config.window(QuotaKind::Session)).with_timezone(&offset)
                })),
            },
            SectionMatch::Unmatched => SessionQuota {
                used: 0,
                remaining_pct: 100,
                reset_at: None,
            },
        };

        let model_detail = self.weekly_model.as_matched().map(|m| {
            format!("{} only: {}% left", m.model, 100 - m.used)
        });
        let weekly = match self.weekly {
            SectionMatch::Matched(reading) => WeeklyQuota {
                used: reading.used,
                remaining_pct: 100 - reading.used,
                reset_at: reading.reset_at,
                detail: Some(match model_detail {
                    Some(model) => format!("all models · {}", model),
                    None => "all models".to_string(),
                }),
            },
            SectionMatch::Unmatched => WeeklyQuota {
                used: 0,
                remaining_pct: 100,
                reset_at: None,
                detail: model_detail,
            },
        };

        let extra = match self.extra {
            SectionMatch::Matched(reading) => {
                let remaining_pct = match reading.spending {
                    Some((spent, cap)) if cap > 0.0 => {
                        let used = (100.0 * spent / cap).round().clamp(0.0, 100.0);
                        100 - used as u8
                    }
                    _ => 100 - reading.used.unwrap_or(0),
                };
                let (spent, cap) = reading.spending.unwrap_or((0.0, 100.0));
                ExtraQuota {
                    remaining_pct,
                    spent,
                    cap,
                    reset_at: reading.reset_at,
                }
            }
            SectionMatch::Unmatched => ExtraQuota {
                remaining_pct: 100,
                spent: 0.0,
                cap: 100.0,
                reset_at: None,
            },
        };

        Ok(UsageSnapshot {
            session,
            weekly,
            extra,
            updated_at: self.captured_at,
            source: SOURCE_CLI_USAGE.to_string(),
        })
    }
}

/// Scan captured `/usage` text for the three quota blocks.
pub fn extract(text: &str, now: DateTime<Utc>, config: &UsageConfig) -> Extraction {
    let resolver = ResetResolver::from_config(config);
    let text = ANSI_ESCAPE.replace_all(text, "");
    let sections = Sections::locate(&text);

    let session = match sections.body(&text, SESSION_ANCHOR.find(&text).map(|m| m.end())) {
        Some(body) => match read_meter(body, now, &resolver) {
            Some((used, reset_at)) => SectionMatch::Matched(SessionReading { used, reset_at }),
            None => SectionMatch::Unmatched,
        },
        None => SectionMatch::Unmatched,
    };

    let weekly = match sections.body(&text, WEEKLY_ANCHOR.find(&text).map(|m| m.end())) {
        Some(body) => match read_meter(body, now, &resolver) {
            Some((used, reset_at)) => SectionMatch::Matched(WeeklyReading { used, reset_at }),
            None => SectionMatch::Unmatched,
        },
        None => SectionMatch::Unmatched,
    };

    let weekly_model = match MODEL_ANCHOR.captures(&text) {
        Some(caps) => {
            let model = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let end = caps.get(0).map(|m| m.end());
            sections
                .body(&text, end)
                .and_then(first_percent)
                .map(|(used, _)| {
                    SectionMatch::Matched(ModelReading {
                        model: model.to_string(),
                        used,
                    })
                })
                .unwrap_or(SectionMatch::Unmatched)
        }
        None => SectionMatch::Unmatched,
    };

    let extra = match sections.body(&text, EXTRA_ANCHOR.find(&text).map(|m| m.end())) {
        Some(body) => read_extra(body, now, &resolver),
        None => SectionMatch::Unmatched,
    };

    debug!(
        "Usage extraction: session={} weekly={} weekly_model={} extra={}",
        session.is_matched(),
        weekly.is_matched(),
        weekly_model.is_matched(),
        extra.is_matched()
    );

    Extraction {
        session,
        weekly,
        weekly_model,
        extra,
        captured_at: now,
    }
}

/// Extract and assemble in one step.
///
/// Returns [`UsageError::NoQuotaMatched`] when the text holds no quota at all.
pub fn extract_snapshot(
    text: &str,
    now: DateTime<Utc>,
    config: &UsageConfig,
) -> Result<UsageSnapshot, UsageError> {
    extract(text, now, config).into_snapshot(config)
}

/// Start offsets of every recognised label, used to bound each block
struct Sections {
    starts: Vec<usize>,
}

impl Sections {
    fn locate(text: &str) -> Self {
        let mut starts: Vec<usize> = [&SESSION_ANCHOR, &WEEKLY_ANCHOR, &MODEL_ANCHOR, &EXTRA_ANCHOR]
            .iter()
            .flat_map(|re| re.find_iter(text).map(|m| m.start()))
            .collect();
        starts.sort_unstable();
        starts.dedup();
        Self { starts }
    }

    /// Text from the end of a label up to the next label (or end of text)
    fn body<'a>(&self, text: &'a str, label_end: Option<usize>) -> Option<&'a str> {
        let start = label_end?;
        let end = self
            .starts
            .iter()
            .copied()
            .find(|s| *s >= start)
            .unwrap_or(text.len());
        text.get(start..end)
    }
}

/// First "N% used" in a block, with its end offset. Decimal figures are
/// rounded and figures over 100 are capped.
fn first_percent(body: &str) -> Option<(u8, usize)> {
    let caps = PERCENT_PATTERN.captures(body)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let end = caps.get(0)?.end();
    Some((value.round().min(100.0) as u8, end))
}

/// Reset phrase at or after `from`, resolved to a timestamp
fn reset_after(
    body: &str,
    from: usize,
    now: DateTime<Utc>,
    resolver: &ResetResolver,
) -> Option<DateTime<FixedOffset>> {
    let phrase = RESET_PATTERN.find(body.get(from..)?)?;
    resolver.resolve(phrase.as_str().trim(), now)
}

/// Percentage and reset time of a session or weekly block
fn read_meter(
    body: &str,
    now: DateTime<Utc>,
    resolver: &ResetResolver,
) -> Option<(u8, Option<DateTime<FixedOffset>>)> {
    let (used, end) = first_percent(body)?;
    Some((used, reset_after(body, end, now, resolver)))
}

fn read_extra(
    body: &str,
    now: DateTime<Utc>,
    resolver: &ResetResolver,
) -> SectionMatch<ExtraReading> {
    let percent = first_percent(body);
    let spending = SPENDING_PATTERN.captures(body).and_then(|caps| {
        let spent = parse_amount(caps.get(1)?.as_str())?;
        let cap = parse_amount(caps.get(2)?.as_str())?;
        Some((spent, cap))
    });

    if percent.is_none() && spending.is_none() {
        return SectionMatch::Unmatched;
    }

    let reset_from = percent.map(|(_, end)| end).unwrap_or(0);
    SectionMatch::Matched(ExtraReading {
        used: percent.map(|(used, _)| used),
        spending,
        reset_at: reset_after(body, reset_from, now, resolver),
    })
}

/// "1,234.50" -> 1234.5
fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}
