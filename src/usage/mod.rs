//! Acquiring the `/usage` screen and turning it into saved snapshots.

mod fetcher;
mod poller;

pub use fetcher::acquire_usage_text;
pub use poller::{ingest, PollOutcome, TmuxSource, UsagePoller, UsageSource};
