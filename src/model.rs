use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Metadata for one exportable attachment of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub download_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: u64,
}

/// The submission response record the exported files belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

/// Snapshot of export inputs, read once when an export is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub files: Vec<FileDescriptor>,
    pub username: String,
}

/// Resolved export settings. Serialized for the `--verbose` config dump.
#[derive(Debug, Clone, Serialize)]
pub struct ExportConfig {
    /// Base used to resolve relative download URLs.
    pub base_url: Option<String>,
    pub out_dir: PathBuf,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

/// Events emitted by the pipeline and request tracker, consumed by the CLI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExportEvent {
    RequestStarted {
        key: String,
    },
    FileFetched {
        name: String,
        bytes: u64,
    },
    ArchiveSaved {
        path: PathBuf,
        bytes: u64,
    },
    RequestCompleted {
        key: String,
    },
    RequestFailed {
        key: String,
        message: String,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the pipeline and rendered by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    FetchingFiles { count: usize },
    AssemblingArchive { entries: usize },
}

impl InfoEvent {
    /// Render a human-readable message for the CLI.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::FetchingFiles { count } => format!("Fetching {} file(s)", count),
            InfoEvent::AssemblingArchive { entries } => {
                format!("Assembling archive with {} entries", entries)
            }
        }
    }
}

/// Outcome of a finished export, printed by the CLI in JSON mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    #[serde(default)]
    pub exported_at_utc: String,
    pub username: String,
    pub archive_path: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
    #[serde(default)]
    pub overall_feedback: Option<String>,
}
