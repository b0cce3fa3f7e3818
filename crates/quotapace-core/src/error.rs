use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the extraction pipeline and the snapshot store
#[derive(Debug, Error)]
pub enum UsageError {
    /// None of the three quota sections could be found in the captured text
    #[error("no usage quota found in captured output")]
    NoQuotaMatched,

    /// A snapshot or history file could not be read or written
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot could not be encoded or decoded
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

impl UsageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
