//! Error types for the export pipeline.
//!
//! Each pipeline stage fails with its own type so callers can tell a single
//! failed fetch apart from a failed batch or a failed archive step.

use thiserror::Error;

/// A single file could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("{status_text}")]
    Status { status: u16, status_text: String },
    /// The request never produced a response (connect, TLS, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid download url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// At least one fetch in a batch failed.
///
/// Carries every requested file name, not only the ones that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to download files: {}", names.join(", "))]
pub struct BatchDownloadError {
    pub names: Vec<String>,
}

/// Failure from the archive writer or the save primitive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive write failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("got {blobs} file bodies for {files} files")]
    LengthMismatch { files: usize, blobs: usize },
}

/// Failure of a tracked export operation.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Download(#[from] BatchDownloadError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("export task ended unexpectedly: {0}")]
    Join(#[from] tokio::task::JoinError),
}
