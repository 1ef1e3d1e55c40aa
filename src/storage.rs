//! Local persistence for finished archives.

use crate::error::ArchiveError;
use crate::model::{ExportEvent, SubmissionResponse};
use anyhow::{Context, Result};
use bytes::Bytes;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Hands a finished archive to the local filesystem.
pub trait SaveTarget: Send + Sync {
    fn save(
        &self,
        blob: Bytes,
        suggested_name: &str,
    ) -> impl Future<Output = Result<(), ArchiveError>> + Send;
}

/// Writes archives into a directory, creating it on first use.
#[derive(Clone)]
pub struct DiskSaver {
    dir: PathBuf,
    event_tx: Option<mpsc::UnboundedSender<ExportEvent>>,
}

impl DiskSaver {
    pub fn new(dir: impl Into<PathBuf>, event_tx: Option<mpsc::UnboundedSender<ExportEvent>>) -> Self {
        Self {
            dir: dir.into(),
            event_tx,
        }
    }

    /// Where an archive with `suggested_name` ends up.
    pub fn target_path(&self, suggested_name: &str) -> PathBuf {
        // Keep only the final component; the archive always lands inside `dir`.
        let file_name = Path::new(suggested_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("submission.zip"));
        self.dir.join(file_name)
    }
}

impl SaveTarget for DiskSaver {
    async fn save(&self, blob: Bytes, suggested_name: &str) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.target_path(suggested_name);
        tokio::fs::write(&path, &blob).await?;
        tracing::info!(path = %path.display(), bytes = blob.len(), "archive saved");
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ExportEvent::ArchiveSaved {
                path,
                bytes: blob.len() as u64,
            });
        }
        Ok(())
    }
}

/// Default directory for saved archives: the user's download dir, else the working dir.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Load a submission response record from a JSON file.
pub fn load_response(path: &Path) -> Result<SubmissionResponse> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read response file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse response file {}", path.display()))
}
