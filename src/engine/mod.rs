pub mod archive;
pub mod fetch;
pub mod manifest;

use crate::error::{ArchiveError, BatchDownloadError};
use crate::model::{ExportEvent, FileDescriptor, InfoEvent};
use crate::storage::SaveTarget;
use archive::ZipArchiveWriter;
use bytes::Bytes;
use fetch::FileFetcher;
use std::future::Future;
use tokio::sync::mpsc;

/// The two asynchronous stages an export runs through.
///
/// The orchestrator only talks to this trait, so tests can swap either stage.
pub trait ExportStages: Send + Sync + 'static {
    fn download_blobs(
        &self,
        files: &[FileDescriptor],
    ) -> impl Future<Output = Result<Vec<Bytes>, BatchDownloadError>> + Send;

    fn zip_files(
        &self,
        files: &[FileDescriptor],
        blobs: Vec<Bytes>,
        username: &str,
    ) -> impl Future<Output = Result<(), ArchiveError>> + Send;
}

/// Production stages: fetch over HTTP, zip in memory, save through `saver`.
pub struct Pipeline<F, S> {
    fetcher: F,
    saver: S,
    event_tx: Option<mpsc::UnboundedSender<ExportEvent>>,
}

impl<F, S> Pipeline<F, S>
where
    F: FileFetcher,
    S: SaveTarget,
{
    pub fn new(fetcher: F, saver: S, event_tx: Option<mpsc::UnboundedSender<ExportEvent>>) -> Self {
        Self {
            fetcher,
            saver,
            event_tx,
        }
    }

    fn info(&self, info: InfoEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ExportEvent::Info(info));
        }
    }
}

impl<F, S> ExportStages for Pipeline<F, S>
where
    F: FileFetcher + 'static,
    S: SaveTarget + 'static,
{
    async fn download_blobs(
        &self,
        files: &[FileDescriptor],
    ) -> Result<Vec<Bytes>, BatchDownloadError> {
        self.info(InfoEvent::FetchingFiles { count: files.len() });
        fetch::download_blobs(&self.fetcher, files).await
    }

    async fn zip_files(
        &self,
        files: &[FileDescriptor],
        blobs: Vec<Bytes>,
        username: &str,
    ) -> Result<(), ArchiveError> {
        self.info(InfoEvent::AssemblingArchive {
            entries: files.len() + 1,
        });
        for (file, entry) in files.iter().zip(archive::entry_names(files)) {
            if file.name != entry {
                self.info(InfoEvent::Message(format!(
                    "{} stored as {} to avoid a name clash",
                    file.name, entry
                )));
            }
        }
        archive::zip_files(files, blobs, username, ZipArchiveWriter::new(), &self.saver).await
    }
}
