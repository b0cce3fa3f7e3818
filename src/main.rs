use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use quotapace_core::{assess_snapshot, SnapshotStore, UsageConfig, UsageSnapshot};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quotapace::config::{Command, Config, Settings};
use quotapace::dashboard;
use quotapace::ui::StatusView;
use quotapace::usage::{ingest, TmuxSource, UsagePoller, UsageSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    let store = SnapshotStore::new(settings.data_dir());

    match cli.command() {
        Command::Fetch { no_save } => {
            let raw = TmuxSource::new(settings.fetch.clone()).acquire().await?;
            report(&raw, cli.debug, (!no_save).then_some(&store), &settings.usage)
        }
        Command::Parse { file, save } => {
            let raw = read_input(file)?;
            report(&raw, cli.debug, save.then_some(&store), &settings.usage)
        }
        Command::Status => {
            let snapshot = store.load_current()?;
            println!(
                "{}",
                StatusView::render(snapshot.as_ref(), Utc::now(), &settings.usage)
            );
            Ok(())
        }
        Command::Watch { .. } => {
            let poller = UsagePoller::new(
                TmuxSource::new(settings.fetch.clone()),
                Some(store),
                settings.usage.clone(),
            );
            let interval = Duration::from_secs(settings.fetch.poll_interval_secs);
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            poller
                .run(interval, shutdown, |snapshot| {
                    println!(
                        "{}\n",
                        StatusView::render(Some(snapshot), Utc::now(), &settings.usage)
                    );
                })
                .await;
            Ok(())
        }
        Command::Dashboard { open } => {
            let build = dashboard::build_dashboard(
                &store,
                &settings.dashboard_dir(),
                settings.dashboard.template.as_deref(),
            )?;
            println!("{} entries → {}", build.points, build.data_path.display());
            if let Some(ref html) = build.html_path {
                println!("Dashboard → {}", html.display());
            }
            if open {
                let html = build.html_path.as_deref().context(
                    "No dashboard.html was written; set [dashboard] template in the config file",
                )?;
                dashboard::open_path(html)?;
            }
            Ok(())
        }
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("quotapace=debug,quotapace_core=debug")
    } else {
        EnvFilter::new("quotapace=info,quotapace_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Screen text from a file, or stdin when no file is given
fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Extract (and maybe save) a snapshot from `raw`, then print it with pacing
fn report(
    raw: &str,
    debug: bool,
    store: Option<&SnapshotStore>,
    config: &UsageConfig,
) -> Result<()> {
    if debug {
        println!("{}", raw);
    }
    let snapshot = ingest(raw, store, config)?;
    println!("{}", serde_json::to_string_pretty(&summary(&snapshot, config))?);
    Ok(())
}

fn summary(snapshot: &UsageSnapshot, config: &UsageConfig) -> serde_json::Value {
    let pacing: serde_json::Map<String, serde_json::Value> =
        assess_snapshot(snapshot, Utc::now(), config)
            .into_iter()
            .map(|(kind, result)| (kind.label().to_lowercase(), json!(result)))
            .collect();
    json!({
        "snapshot": snapshot,
        "pacing": pacing,
    })
}
