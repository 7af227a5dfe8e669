use std::path::{Path, PathBuf};

use chrono::Utc;
use ltk_reconcile::Observation;
use tracing::debug;

use crate::feed::decode_feed;
use crate::{FetchError, ScoreSource};

/// Reads the feed document from disk on every fetch.
///
/// Used for offline replays: edit the file between cycles and the runtime
/// picks up the change on its next fetch.
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    path: PathBuf,
}

impl SnapshotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ScoreSource for SnapshotFileSource {
    fn name(&self) -> &'static str {
        "snapshot-file"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<Observation>, FetchError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Transport(format!("{}: {e}", self.path.display())))?;
        let obs = decode_feed(&body, Utc::now())?;
        debug!(path = %self.path.display(), rows = obs.len(), "snapshot file read");
        Ok(obs)
    }
}
