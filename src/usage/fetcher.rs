//! Capture the `/usage` screen from a throwaway Claude Code instance.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::FetchSettings;
use crate::tmux::TmuxClient;

/// Window name for the hidden pane
const WINDOW_NAME: &str = "quotapace-usage";

/// Shown at the bottom of the input box once Claude Code accepts input
const READY_MARKERS: [&str; 2] = ["-- INSERT --", "? for shortcuts"];

const TRUST_PROMPT: &str = "Yes, I trust this folder";

/// Present in every quota block of the `/usage` overlay
const USAGE_MARKER: &str = "% used";

/// Run Claude Code in a hidden tmux window, open `/usage` and return the
/// captured screen text.
///
/// The window is opened in `$HOME` inside `settings.tmux_session` (created
/// detached if missing). The pane is torn down whether or not the overlay
/// showed up.
pub async fn acquire_usage_text(settings: &FetchSettings) -> Result<String> {
    let tmux = TmuxClient::with_capture_lines(settings.capture_lines);

    let home = dirs::home_dir()
        .context("Cannot determine the home directory to start Claude Code in")?;
    let home = home.to_string_lossy();

    tmux.ensure_session(&settings.tmux_session, &home)
        .with_context(|| format!("Failed to prepare tmux session {}", settings.tmux_session))?;

    let target = tmux
        .new_window(&settings.tmux_session, &home, Some(WINDOW_NAME))
        .context("Failed to create hidden window for usage fetch")?;
    info!("Usage fetch: created hidden pane {}", target);

    let text = drive_usage_screen(&tmux, &target, settings).await;
    cleanup(&tmux, &target).await;

    match text? {
        Some(text) => Ok(text),
        None => anyhow::bail!("Usage overlay did not appear within timeout"),
    }
}

async fn drive_usage_screen(
    tmux: &TmuxClient,
    target: &str,
    settings: &FetchSettings,
) -> Result<Option<String>> {
    tmux.run_command(target, &settings.command)
        .context("Failed to start Claude Code in usage pane")?;

    let startup = Duration::from_secs(settings.startup_timeout_secs);
    if !wait_for_ready(tmux, target, startup).await {
        anyhow::bail!("Claude Code did not start within {}s", settings.startup_timeout_secs);
    }

    debug!("Usage fetch: Claude Code ready, sending /usage");
    tokio::time::sleep(Duration::from_millis(500)).await;

    tmux.send_keys_literal(target, "/usage")
        .context("Failed to send /usage")?;
    // let the slash-command menu settle before confirming
    tokio::time::sleep(Duration::from_millis(300)).await;
    tmux.send_keys(target, "Enter")
        .context("Failed to send Enter after /usage")?;

    let output = Duration::from_secs(settings.output_timeout_secs);
    Ok(wait_for_usage_output(tmux, target, output).await)
}

/// Close the overlay, quit Claude Code and drop the pane. Errors are ignored:
/// the pane may already be gone.
async fn cleanup(tmux: &TmuxClient, target: &str) {
    for (key, pause_ms) in [("Escape", 300), ("C-c", 300), ("C-c", 500)] {
        let _ = tmux.send_keys(target, key);
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }
    if let Err(e) = tmux.kill_pane(target) {
        debug!("Usage fetch: kill-pane {} failed: {}", target, e);
    }
    info!("Usage fetch: cleaned up pane {}", target);
}

/// Poll until Claude Code accepts input, confirming the folder-trust prompt
/// once if it appears
async fn wait_for_ready(tmux: &TmuxClient, target: &str, timeout: Duration) -> bool {
    let start = Instant::now();
    let mut trust_confirmed = false;

    while start.elapsed() < timeout {
        tokio::time::sleep(Duration::from_millis(500)).await;

        let Ok(content) = tmux.capture_pane_plain(target) else {
            continue;
        };
        if is_ready(&content) {
            debug!("Usage fetch: input prompt visible");
            return true;
        }
        if !trust_confirmed && content.contains(TRUST_PROMPT) {
            debug!("Usage fetch: auto-confirming trust prompt");
            let _ = tmux.send_keys(target, "Enter");
            trust_confirmed = true;
        }
    }

    warn!("Usage fetch: timed out waiting for Claude Code to start");
    false
}

async fn wait_for_usage_output(
    tmux: &TmuxClient,
    target: &str,
    timeout: Duration,
) -> Option<String> {
    let start = Instant::now();

    while start.elapsed() < timeout {
        tokio::time::sleep(Duration::from_millis(300)).await;

        if let Ok(content) = tmux.capture_pane_plain(target) {
            if has_usage_output(&content) {
                debug!("Usage fetch: detected usage output");
                return Some(content);
            }
            debug!(
                "Usage fetch: waiting for /usage output ({:.1}s elapsed)",
                start.elapsed().as_secs_f32()
            );
        }
    }

    warn!("Usage fetch: timed out waiting for /usage output");
    None
}

fn is_ready(content: &str) -> bool {
    READY_MARKERS.iter().any(|marker| content.contains(marker))
}

fn has_usage_output(content: &str) -> bool {
    content.contains(USAGE_MARKER)
}
