//! Fetch-parse-save cycle and the periodic `watch` loop.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use quotapace_core::{extract_snapshot, SnapshotStore, UsageConfig, UsageSnapshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::fetcher::acquire_usage_text;
use crate::config::FetchSettings;

/// Where the `/usage` screen text comes from
pub trait UsageSource {
    fn acquire(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Live source: a hidden Claude Code pane in tmux
pub struct TmuxSource {
    settings: FetchSettings,
}

impl TmuxSource {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }
}

impl UsageSource for TmuxSource {
    fn acquire(&self) -> impl Future<Output = Result<String>> + Send {
        acquire_usage_text(&self.settings)
    }
}

/// Extract a snapshot from captured screen text and save it when a store is
/// given. Nothing is written when extraction fails.
pub fn ingest(
    raw: &str,
    store: Option<&SnapshotStore>,
    config: &UsageConfig,
) -> Result<UsageSnapshot> {
    let snapshot = extract_snapshot(raw, Utc::now(), config)
        .context("Failed to extract usage from captured screen")?;

    if let Some(store) = store {
        store
            .save(&snapshot)
            .context("Failed to save usage snapshot")?;
    }
    debug!(
        "Usage poll: session {}%, weekly {}%, extra {}% remaining",
        snapshot.session.remaining_pct,
        snapshot.weekly.remaining_pct,
        snapshot.extra.remaining_pct
    );
    Ok(snapshot)
}

/// Result of one poll
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Screen text as captured
    pub raw: String,
    pub snapshot: UsageSnapshot,
}

/// Runs the acquire → extract → save cycle
pub struct UsagePoller<S> {
    source: S,
    /// `None` polls without persisting
    store: Option<SnapshotStore>,
    config: UsageConfig,
}

impl<S: UsageSource> UsagePoller<S> {
    pub fn new(source: S, store: Option<SnapshotStore>, config: UsageConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Acquire the screen once, then [`ingest`] it
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let raw = self.source.acquire().await?;
        let snapshot = ingest(&raw, self.store.as_ref(), &self.config)?;
        Ok(PollOutcome { raw, snapshot })
    }

    /// Poll every `interval` until `shutdown` resolves. The first poll runs
    /// immediately; failed polls are logged and retried on the next tick.
    /// A shutdown during a poll lets that poll finish so its tmux pane is
    /// cleaned up. Returns the number of successful polls.
    pub async fn run<F>(
        &self,
        interval: Duration,
        shutdown: F,
        mut on_snapshot: impl FnMut(&UsageSnapshot),
    ) -> u32
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut successes = 0u32;

        info!("Watching usage every {}s", interval.as_secs());
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping usage watch");
                    break;
                }
                _ = ticker.tick() => {
                    let poll = self.poll_once();
                    tokio::pin!(poll);
                    let mut stopping = false;
                    let result = tokio::select! {
                        result = &mut poll => result,
                        _ = &mut shutdown => {
                            info!("Stopping usage watch; finishing current poll");
                            stopping = true;
                            poll.await
                        }
                    };
                    match result {
                        Ok(outcome) => {
                            successes = successes.saturating_add(1);
                            on_snapshot(&outcome.snapshot);
                        }
                        Err(e) => warn!("Usage poll failed: {:#}", e),
                    }
                    if stopping {
                        break;
                    }
                }
            }
        }
        successes
    }
}
