//! Export orchestrator.
//!
//! Snapshots the export inputs, then runs download and archive stages as one
//! tracked request under `downloadFiles`.

use super::tracker::{RequestKey, RequestTracker, TrackedRequest};
use crate::engine::ExportStages;
use crate::error::ExportError;
use crate::model::ExportRequest;
use crate::state::ExportSource;
use std::sync::Arc;

pub struct Exporter<St, Src> {
    stages: Arc<St>,
    source: Src,
    tracker: RequestTracker,
}

impl<St, Src> Exporter<St, Src>
where
    St: ExportStages,
    Src: ExportSource,
{
    pub fn new(stages: St, source: Src, tracker: RequestTracker) -> Self {
        Self {
            stages: Arc::new(stages),
            source,
            tracker,
        }
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Dispatch an export of the current files for the current user.
    ///
    /// Inputs are read here, synchronously; later state changes do not reach
    /// the running request. The archive stage only runs if every file was fetched.
    pub fn download_files(&self) -> TrackedRequest<(), ExportError> {
        let ExportRequest { files, username } = self.source.export_request();
        tracing::info!(files = files.len(), %username, "export dispatched");

        let stages = Arc::clone(&self.stages);
        self.tracker.track(RequestKey::DownloadFiles, async move {
            let blobs = stages.download_blobs(&files).await?;
            stages.zip_files(&files, blobs, &username).await?;
            Ok::<(), ExportError>(())
        })
    }
}
