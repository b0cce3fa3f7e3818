use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Command;
use tracing::debug;

/// Pane target as printed by `-F '#{session_name}:#{window_index}.#{pane_index}'`
static TARGET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+:\d+\.\d+$").expect("Invalid TARGET_PATTERN regex"));

/// Session names are passed to `-s`/`-t`; keep them to plain identifiers
static SESSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.][A-Za-z0-9_.-]*$").expect("Invalid SESSION_PATTERN regex"));

const TARGET_FORMAT: &str = "#{session_name}:#{window_index}.#{pane_index}";

/// Reject anything that is not a `session:window.pane` target (e.g. "main:0.1")
fn validate_target(target: &str) -> Result<()> {
    if !TARGET_PATTERN.is_match(target) {
        anyhow::bail!("Invalid tmux target format: {}", target);
    }
    Ok(())
}

fn validate_session(name: &str) -> Result<()> {
    if !SESSION_PATTERN.is_match(name) {
        anyhow::bail!("Invalid tmux session name: {}", name);
    }
    Ok(())
}

/// Run `tmux <args>` and return stdout, failing on a non-zero exit
fn tmux(args: &[&str]) -> Result<String> {
    let subcommand = args.first().copied().unwrap_or("");
    let output = Command::new("tmux")
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute tmux {}", subcommand))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("tmux {} failed: {}", subcommand, stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Thin wrapper over the tmux CLI, just enough to drive a hidden pane
pub struct TmuxClient {
    /// Number of scrollback lines to capture from a pane
    capture_lines: u32,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self { capture_lines: 100 }
    }

    pub fn with_capture_lines(capture_lines: u32) -> Self {
        Self { capture_lines }
    }

    /// Whether a session with this exact name exists
    pub fn has_session(&self, name: &str) -> bool {
        if validate_session(name).is_err() {
            return false;
        }
        let exact = format!("={}", name);
        tmux(&["has-session", "-t", &exact]).is_ok()
    }

    /// Create a detached session unless one already exists
    pub fn ensure_session(&self, name: &str, cwd: &str) -> Result<()> {
        validate_session(name)?;
        if self.has_session(name) {
            return Ok(());
        }
        debug!("Creating detached tmux session {}", name);
        tmux(&["new-session", "-d", "-s", name, "-c", cwd])?;
        Ok(())
    }

    /// Open a window in `session` and return its pane target
    pub fn new_window(&self, session: &str, cwd: &str, name: Option<&str>) -> Result<String> {
        validate_session(session)?;
        let mut args = vec!["new-window", "-d", "-t", session, "-c", cwd];
        if let Some(name) = name {
            args.extend(["-n", name]);
        }
        args.extend(["-P", "-F", TARGET_FORMAT]);

        let target = tmux(&args)?.trim().to_string();
        validate_target(&target)
            .with_context(|| format!("tmux new-window returned an unusable target: {}", target))?;
        Ok(target)
    }

    /// Pane content without escape sequences
    pub fn capture_pane_plain(&self, target: &str) -> Result<String> {
        validate_target(target)?;
        let start_line = format!("-{}", self.capture_lines);
        tmux(&["capture-pane", "-p", "-t", target, "-S", &start_line])
    }

    /// Send a key name such as `Enter`, `Escape` or `C-c`
    pub fn send_keys(&self, target: &str, keys: &str) -> Result<()> {
        validate_target(target)?;
        tmux(&["send-keys", "-t", target, keys]).map(drop)
    }

    /// Type `keys` verbatim (no key-name lookup)
    pub fn send_keys_literal(&self, target: &str, keys: &str) -> Result<()> {
        validate_target(target)?;
        tmux(&["send-keys", "-t", target, "-l", keys]).map(drop)
    }

    /// Type a shell command into the pane and press Enter
    pub fn run_command(&self, target: &str, command: &str) -> Result<()> {
        self.send_keys_literal(target, command)?;
        self.send_keys(target, "Enter")
    }

    pub fn kill_pane(&self, target: &str) -> Result<()> {
        validate_target(target)?;
        tmux(&["kill-pane", "-t", target]).map(drop)
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}
