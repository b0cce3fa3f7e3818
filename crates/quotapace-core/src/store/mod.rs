//! Snapshot persistence: the current snapshot plus an append-only history.
//!
//! ```text
//! <dir>/usage.json      current snapshot, pretty-printed, replaced on save
//! <dir>/history.jsonl   one snapshot per line, only ever appended to
//! ```

mod history;

pub use history::{load_history_points, normalize_entry, ExtraPoint, HistoryPoint, PointQuota};

use std::fs::{self, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::UsageError;
use crate::usage::UsageSnapshot;

const CURRENT_FILE: &str = "usage.json";
const HISTORY_FILE: &str = "history.jsonl";

/// File-backed store for usage snapshots.
///
/// Writers must be serialized by the caller; concurrent saves are
/// last-writer-wins for the current file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    /// Replace the current snapshot and append it to the history log
    pub fn save(&self, snapshot: &UsageSnapshot) -> Result<(), UsageError> {
        self.write_current(snapshot)?;
        self.append_history(snapshot)?;
        debug!("Saved usage snapshot to {}", self.dir.display());
        Ok(())
    }

    /// Write the current snapshot through a temp file so readers never see a
    /// partial document
    pub fn write_current(&self, snapshot: &UsageSnapshot) -> Result<(), UsageError> {
        self.ensure_dir()?;
        let path = self.current_path();
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&tmp, json + "\n").map_err(|e| UsageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| UsageError::io(&path, e))
    }

    /// Append one line to the history log
    pub fn append_history(&self, snapshot: &UsageSnapshot) -> Result<(), UsageError> {
        self.ensure_dir()?;
        let path = self.history_path();
        let line = serde_json::to_string(snapshot)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| UsageError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", line).map_err(|e| UsageError::io(&path, e))?;
        writer.flush().map_err(|e| UsageError::io(&path, e))
    }

    /// The last saved snapshot, or `None` if nothing has been saved yet
    pub fn load_current(&self) -> Result<Option<UsageSnapshot>, UsageError> {
        let path = self.current_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(UsageError::io(&path, e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// The history log normalized into dashboard points. Malformed lines
    /// are skipped; a missing log is an error.
    pub fn history_points(&self) -> Result<Vec<HistoryPoint>, UsageError> {
        let path = self.history_path();
        let file = fs::File::open(&path).map_err(|e| UsageError::io(&path, e))?;
        let points = load_history_points(BufReader::new(file));
        debug!("Read {} history points from {}", points.len(), path.display());
        Ok(points)
    }

    fn ensure_dir(&self) -> Result<(), UsageError> {
        fs::create_dir_all(&self.dir).map_err(|e| UsageError::io(&self.dir, e))
    }
}
