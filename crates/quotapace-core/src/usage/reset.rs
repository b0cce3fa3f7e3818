//! Resolve "Resets ..." phrases from `/usage` output into absolute timestamps.
//!
//! Phrases seen in the wild:
//! ```text
//!   Resets 5pm (America/Los_Angeles)
//!   Resets 4:30pm
//!   Resets Feb 6 at 8am
//!   Resets Mar 3, 12am (Asia/Tokyo)
//!   Resets Mar 1 (Asia/Tokyo)
//! ```
//!
//! Each phrase shape is handled by one [`ResetMatcher`]. [`ResetResolver`]
//! tries them in a fixed order and the first one that resolves wins. The
//! trailing timezone name is ignored; every phrase is read in the resolver's
//! reference offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::UsageConfig;

/// "Resets 5pm", "Resets 4:30pm", "Resets 12am"
static CLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bresets\s+(\d{1,2})(?::(\d{2}))?\s*([ap]m)\b")
        .expect("Invalid CLOCK_PATTERN regex")
});

/// "Resets Feb 6 at 8am", "Resets Mar 3, 12am"
static CALENDAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bresets\s+([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:\s*,\s*|\s+at\s+)(\d{1,2})(?::(\d{2}))?\s*([ap]m)\b",
    )
    .expect("Invalid CALENDAR_PATTERN regex")
});

/// "Resets Mar 1 (Asia/Tokyo)": a bare date, resetting at its midnight
static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bresets\s+([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?\s*(?:\(|$)")
        .expect("Invalid DATE_PATTERN regex")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// One recognised reset-phrase shape.
///
/// `now` is already expressed in the reference offset; the returned
/// timestamp must be in the same offset and strictly after `now`.
pub trait ResetMatcher: Send + Sync {
    /// Short name used in debug logs
    fn name(&self) -> &'static str;

    /// Resolve the phrase, or `None` if it does not have this shape
    fn resolve(&self, phrase: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>>;
}

/// Same-day clock time, rolled to tomorrow when already past.
///
/// "Resets 12am" is today's midnight, which is never after `now`, so it
/// always lands on the next midnight.
pub struct ClockTimeMatcher;

impl ResetMatcher for ClockTimeMatcher {
    fn name(&self) -> &'static str {
        "clock_time"
    }

    fn resolve(&self, phrase: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let caps = CLOCK_PATTERN.captures(phrase)?;
        let hour = to_24_hour(caps.get(1)?.as_str(), caps.get(3)?.as_str())?;
        let minute = parse_minute(caps.get(2).map(|m| m.as_str()))?;

        let candidate = at_local(now.offset(), now.date_naive(), hour, minute)?;
        if candidate > *now {
            Some(candidate)
        } else {
            Some(candidate + Duration::days(1))
        }
    }
}

/// Month, day and clock time in the current year, rolled to next year when
/// already past.
pub struct CalendarMatcher;

impl ResetMatcher for CalendarMatcher {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn resolve(&self, phrase: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let caps = CALENDAR_PATTERN.captures(phrase)?;
        let month = month_number(caps.get(1)?.as_str())?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let hour = to_24_hour(caps.get(3)?.as_str(), caps.get(5)?.as_str())?;
        let minute = parse_minute(caps.get(4).map(|m| m.as_str()))?;

        next_occurrence(now, month, day, hour, minute)
    }
}

/// Bare month and day, resetting at the start of that day.
pub struct DateOnlyMatcher;

impl ResetMatcher for DateOnlyMatcher {
    fn name(&self) -> &'static str {
        "date_only"
    }

    fn resolve(&self, phrase: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let caps = DATE_PATTERN.captures(phrase)?;
        let month = month_number(caps.get(1)?.as_str())?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;

        next_occurrence(now, month, day, 0, 0)
    }
}

/// Ordered cascade of reset-phrase matchers bound to a reference offset
pub struct ResetResolver {
    offset: FixedOffset,
    matchers: Vec<Box<dyn ResetMatcher>>,
}

impl ResetResolver {
    /// Resolver with the built-in cascade: clock time, calendar date with
    /// time, bare calendar date.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            matchers: vec![
                Box::new(ClockTimeMatcher),
                Box::new(CalendarMatcher),
                Box::new(DateOnlyMatcher),
            ],
        }
    }

    pub fn from_config(config: &UsageConfig) -> Self {
        Self::new(config.reset_offset())
    }

    /// Resolver with a custom cascade, tried in the given order
    pub fn with_matchers(offset: FixedOffset, matchers: Vec<Box<dyn ResetMatcher>>) -> Self {
        Self { offset, matchers }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Resolve a reset phrase relative to `now`.
    ///
    /// Returns `None` when no matcher recognises the phrase; callers apply
    /// their own fallback.
    pub fn resolve(&self, phrase: &str, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        let local_now = now.with_timezone(&self.offset);
        for matcher in &self.matchers {
            if let Some(resolved) = matcher.resolve(phrase, &local_now) {
                debug!(
                    "Reset phrase {:?} resolved by {} to {}",
                    phrase,
                    matcher.name(),
                    resolved
                );
                return Some(resolved);
            }
        }
        debug!("Reset phrase {:?} not recognised", phrase);
        None
    }
}

/// Convert a 12-hour clock figure to 0-23. Rejects hours outside 1-12.
fn to_24_hour(hour: &str, meridiem: &str) -> Option<u32> {
    let hour: u32 = hour.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = meridiem.eq_ignore_ascii_case("pm");
    Some(match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    })
}

fn parse_minute(minute: Option<&str>) -> Option<u32> {
    match minute {
        None => Some(0),
        Some(m) => m.parse().ok().filter(|m| *m < 60),
    }
}

/// Month number (1-12) from a name, matched on its first three letters.
/// Unknown names yield `None` rather than a guessed month.
fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}

fn at_local(
    offset: &FixedOffset,
    date: NaiveDate,
    hour: u32,
    minute: u32,
) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    offset.from_local_datetime(&naive).single()
}

/// First occurrence of the given month/day/time strictly after `now`,
/// looking at this year and then the next.
fn next_occurrence(
    now: &DateTime<FixedOffset>,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> Option<DateTime<FixedOffset>> {
    let this_year = NaiveDate::from_ymd_opt(now.year(), month, day)
        .and_then(|date| at_local(now.offset(), date, hour, minute));
    if let Some(candidate) = this_year {
        if candidate > *now {
            return Some(candidate);
        }
    }
    let date = NaiveDate::from_ymd_opt(now.year() + 1, month, day)?;
    at_local(now.offset(), date, hour, minute)
}
