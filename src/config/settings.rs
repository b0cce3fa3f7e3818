use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quotapace_core::UsageConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Claude plan usage pacing")]
pub struct Config {
    /// Enable debug logging and print the raw captured screen
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding usage.json and history.jsonl
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// tmux session used for the hidden Claude Code window
    #[arg(short = 's', long, global = true)]
    pub session: Option<String>,

    /// Subcommand (defaults to `fetch`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Capture /usage from Claude Code, save the snapshot and print it
    Fetch {
        /// Print only; leave the saved snapshot untouched
        #[arg(long)]
        no_save: bool,
    },
    /// Extract a snapshot from captured text (file or stdin)
    Parse {
        /// File with the captured screen; reads stdin when omitted
        file: Option<PathBuf>,

        /// Save the snapshot like `fetch` does
        #[arg(long)]
        save: bool,
    },
    /// Show the saved snapshot with pace per quota
    Status,
    /// Fetch repeatedly until interrupted
    Watch {
        /// Seconds between polls
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },
    /// Build the history dashboard data (and HTML when a template is set)
    Dashboard {
        /// Open the generated dashboard
        #[arg(long)]
        open: bool,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run, `fetch` when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Fetch { no_save: false })
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding usage.json and history.jsonl
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Acquisition settings
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Extraction and pacing settings
    #[serde(default)]
    pub usage: UsageConfig,

    /// Dashboard settings
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

/// How the `/usage` screen is obtained
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// tmux session the hidden window is created in (created if missing)
    #[serde(default = "default_tmux_session")]
    pub tmux_session: String,

    /// Command that starts Claude Code
    #[serde(default = "default_command")]
    pub command: String,

    /// Seconds to wait for Claude Code to become ready
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Seconds to wait for the /usage overlay
    #[serde(default = "default_output_timeout")]
    pub output_timeout_secs: u64,

    /// Number of lines to capture from the pane
    #[serde(default = "default_capture_lines")]
    pub capture_lines: u32,

    /// Seconds between polls in `watch`
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_tmux_session() -> String {
    "quotapace".to_string()
}

fn default_command() -> String {
    "claude".to_string()
}

fn default_startup_timeout() -> u64 {
    30
}

fn default_output_timeout() -> u64 {
    15
}

fn default_capture_lines() -> u32 {
    100
}

/// Default poll interval (10 minutes)
fn default_poll_interval() -> u64 {
    600
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            tmux_session: default_tmux_session(),
            command: default_command(),
            startup_timeout_secs: default_startup_timeout(),
            output_timeout_secs: default_output_timeout(),
            capture_lines: default_capture_lines(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// History dashboard settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// HTML template containing a `let RAW_DATA = [];` line
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Where data.json and dashboard.html are written (defaults to data_dir)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(p) = path {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {:?}", p))?;
            return toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", p));
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("quotapace/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/quotapace/config.toml")),
            dirs::home_dir().map(|p| p.join(".quotapace.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(ref data_dir) = cli.data_dir {
            self.data_dir = Some(data_dir.clone());
        }
        if let Some(ref session) = cli.session {
            self.fetch.tmux_session = session.clone();
        }
        if let Some(Command::Watch {
            interval: Some(interval),
        }) = cli.command
        {
            self.fetch.poll_interval_secs = interval;
        }
    }

    /// Validate and normalize settings values
    ///
    /// Ensures timeouts and the poll interval have a minimum value.
    pub fn validate(&mut self) {
        const MIN_TIMEOUT_SECS: u64 = 1;
        const MIN_POLL_INTERVAL_SECS: u64 = 30;

        if self.fetch.startup_timeout_secs < MIN_TIMEOUT_SECS {
            self.fetch.startup_timeout_secs = MIN_TIMEOUT_SECS;
        }
        if self.fetch.output_timeout_secs < MIN_TIMEOUT_SECS {
            self.fetch.output_timeout_secs = MIN_TIMEOUT_SECS;
        }
        if self.fetch.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            self.fetch.poll_interval_secs = MIN_POLL_INTERVAL_SECS;
        }
        if self.fetch.capture_lines == 0 {
            self.fetch.capture_lines = default_capture_lines();
        }
        self.usage.normalize();
    }

    /// Directory for the snapshot store
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::config_dir().map(|p| p.join("quotapace")))
            .or_else(|| dirs::home_dir().map(|p| p.join(".config/quotapace")))
            .unwrap_or_else(|| PathBuf::from(".quotapace"))
    }

    /// Directory for dashboard output
    pub fn dashboard_dir(&self) -> PathBuf {
        self.dashboard
            .output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir())
    }
}
