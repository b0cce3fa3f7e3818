//! Core library for quotapace.
//!
//! Turns captured Claude Code `/usage` screen text into a [`UsageSnapshot`],
//! resolves the human-formatted reset phrases into absolute timestamps, and
//! scores each quota's pace against its reset window.

pub mod config;
pub mod error;
pub mod pacing;
pub mod store;
pub mod usage;

pub use config::{TierThresholds, UsageConfig, WindowSettings};
pub use error::UsageError;
pub use pacing::{assess, assess_snapshot, elapsed_fraction, pace_score, PaceTier, PacingResult};
pub use store::{HistoryPoint, SnapshotStore};
pub use usage::{
    extract, extract_snapshot, Extraction, QuotaKind, ResetResolver, SectionMatch, UsageSnapshot,
};
