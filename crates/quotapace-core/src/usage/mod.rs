//! Usage extraction: turn captured Claude Code `/usage` output into a snapshot.
//!
//! The host captures the `/usage` overlay as plain text; [`extract`] finds the
//! session, weekly and extra-usage blocks in it and [`ResetResolver`] turns
//! each block's "Resets ..." phrase into an absolute timestamp.

pub mod parser;
pub mod reset;
pub mod types;

#[cfg(test)]
mod tests;

pub use parser::{extract, extract_snapshot, Extraction};
pub use reset::{ResetMatcher, ResetResolver};
pub use types::{
    ExtraQuota, ExtraReading, ModelReading, QuotaKind, QuotaReading, SectionMatch, SessionQuota,
    SessionReading, UsageSnapshot, WeeklyQuota, WeeklyReading, SOURCE_CLI_USAGE,
};
