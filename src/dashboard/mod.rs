//! History dashboard: normalized `data.json` plus an HTML page with the
//! points inlined.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use quotapace_core::store::HistoryPoint;
use quotapace_core::SnapshotStore;
use tracing::{debug, info, warn};

const DATA_FILE: &str = "data.json";
const HTML_FILE: &str = "dashboard.html";

/// Line in the template the inline data is placed after
const DATA_ANCHOR: &str = "let RAW_DATA = [];";

/// What a dashboard build produced
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardBuild {
    pub points: usize,
    pub data_path: PathBuf,
    /// `None` when no template was available
    pub html_path: Option<PathBuf>,
}

/// Normalized history points from the store's history log
pub fn read_points(store: &SnapshotStore) -> Result<Vec<HistoryPoint>> {
    store
        .history_points()
        .with_context(|| format!("No usable history at {}", store.history_path().display()))
}

/// Write `data.json` (and `dashboard.html` when `template` exists) into
/// `out_dir`
pub fn build_dashboard(
    store: &SnapshotStore,
    out_dir: &Path,
    template: Option<&Path>,
) -> Result<DashboardBuild> {
    let points = read_points(store)?;
    let data = serde_json::to_string(&points).context("Failed to encode history points")?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let data_path = out_dir.join(DATA_FILE);
    fs::write(&data_path, &data)
        .with_context(|| format!("Failed to write {}", data_path.display()))?;
    info!("{} history points → {}", points.len(), data_path.display());

    let html_path = match template {
        Some(template) if template.exists() => {
            let html = fs::read_to_string(template)
                .with_context(|| format!("Failed to read template {}", template.display()))?;
            if !html.contains(DATA_ANCHOR) {
                warn!(
                    "Template {} has no `{}` line; data will not be inlined",
                    template.display(),
                    DATA_ANCHOR
                );
            }
            let path = out_dir.join(HTML_FILE);
            fs::write(&path, inject_data(&html, &data))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Dashboard → {}", path.display());
            Some(path)
        }
        Some(template) => {
            warn!("Dashboard template {} not found", template.display());
            None
        }
        None => {
            debug!("No dashboard template configured");
            None
        }
    };

    Ok(DashboardBuild {
        points: points.len(),
        data_path,
        html_path,
    })
}

/// Declare `INLINE_DATA` right after the template's empty `RAW_DATA`
pub fn inject_data(html: &str, data_json: &str) -> String {
    html.replacen(
        DATA_ANCHOR,
        &format!("{}\n\nvar INLINE_DATA = {};\n", DATA_ANCHOR, data_json),
        1,
    )
}

/// Open `path` with the platform's default handler
pub fn open_path(path: &Path) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let status = Command::new(opener)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to execute {}", opener))?;
    if !status.success() {
        anyhow::bail!("{} {} failed: {}", opener, path.display(), status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HISTORY: &str = r#"{"ts": "2026-02-05T10:00:00Z", "session": {"remaining_pct": 70, "used": 30}}
{"updated_at": "2026-02-05T09:00:00Z", "session": {"remaining_pct": 90}, "weekly": {"remaining_pct": 80}}
{"ts": "2026-02-05T11:00:00Z", "event": "reset"}
"#;

    fn store_with_history(dir: &Path) -> SnapshotStore {
        let store = SnapshotStore::new(dir);
        fs::write(store.history_path(), HISTORY).unwrap();
        store
    }

    #[test]
    fn test_inject_data() {
        let html = "<script>\nlet RAW_DATA = [];\nloadData();\n</script>";
        assert_eq!(
            inject_data(html, "[1]"),
            "<script>\nlet RAW_DATA = [];\n\nvar INLINE_DATA = [1];\n\nloadData();\n</script>"
        );
        assert_eq!(inject_data("<p>no anchor</p>", "[]"), "<p>no anchor</p>");
    }

    #[test]
    fn test_build_without_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_history(dir.path());
        let out = dir.path().join("out");

        let build = build_dashboard(&store, &out, None).unwrap();
        assert_eq!(build.points, 2);
        assert_eq!(build.html_path, None);

        let data: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&build.data_path).unwrap()).unwrap();
        assert_eq!(data[0]["session"]["remaining_pct"], 90.0);
        assert_eq!(data[1]["session"]["used"], 30.0);
        assert_eq!(data[1]["weekly"]["remaining_pct"], 100.0);
    }

    #[test]
    fn test_build_with_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_history(dir.path());
        let template = dir.path().join("usage-history.html");
        fs::write(&template, "let RAW_DATA = [];\n").unwrap();

        let build = build_dashboard(&store, dir.path(), Some(template.as_path())).unwrap();
        let html_path = build.html_path.unwrap();
        assert_eq!(html_path, dir.path().join("dashboard.html"));

        let html = fs::read_to_string(html_path).unwrap();
        let data = fs::read_to_string(build.data_path).unwrap();
        assert!(html.contains(&format!("var INLINE_DATA = {};", data)));
    }

    #[test]
    fn test_missing_template_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_history(dir.path());
        let missing = dir.path().join("missing.html");
        let build = build_dashboard(&store, dir.path(), Some(missing.as_path())).unwrap();
        assert_eq!(build.html_path, None);
        assert!(build.data_path.exists());
    }

    #[test]
    fn test_missing_history_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(build_dashboard(&store, dir.path(), None).is_err());
    }
}
