use crate::engine::manifest::{build_manifest, MANIFEST_ENTRY};
use crate::error::ArchiveError;
use crate::model::FileDescriptor;
use crate::storage::SaveTarget;
use bytes::Bytes;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Content handed to an archive entry.
#[derive(Debug, Clone)]
pub enum EntrySource {
    Text(String),
    Binary(Bytes),
}

impl EntrySource {
    fn as_bytes(&self) -> &[u8] {
        match self {
            EntrySource::Text(s) => s.as_bytes(),
            EntrySource::Binary(b) => &b[..],
        }
    }
}

/// Writes named entries and yields the finished archive on `close`.
pub trait ArchiveWriter {
    fn add(&mut self, name: &str, source: EntrySource) -> Result<(), ArchiveError>;
    fn close(self) -> Result<Bytes, ArchiveError>;
}

/// In-memory zip writer with deflated entries.
pub struct ZipArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    opts: FileOptions,
}

impl ZipArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            opts: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }
}

impl Default for ZipArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add(&mut self, name: &str, source: EntrySource) -> Result<(), ArchiveError> {
        self.zip.start_file(name, self.opts)?;
        self.zip.write_all(source.as_bytes())?;
        Ok(())
    }

    fn close(mut self) -> Result<Bytes, ArchiveError> {
        let cursor = self.zip.finish()?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}

/// Deterministic archive file name for a user's export.
pub fn archive_file_name(username: &str) -> String {
    format!("{username}-submission.zip")
}

/// Archive entry names for `files`, in order.
///
/// Names that collide with the manifest or an earlier entry get a numbered
/// suffix before the extension, e.g. `manifest (1).txt`.
pub fn entry_names(files: &[FileDescriptor]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::from([MANIFEST_ENTRY.to_string()]);
    files
        .iter()
        .map(|file| {
            let mut name = file.name.clone();
            if used.contains(&name) {
                let (stem, ext) = match file.name.rsplit_once('.') {
                    Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
                    _ => (file.name.as_str(), None),
                };
                let mut n = 1;
                loop {
                    name = match ext {
                        Some(ext) => format!("{stem} ({n}).{ext}"),
                        None => format!("{stem} ({n})"),
                    };
                    if !used.contains(&name) {
                        break;
                    }
                    n += 1;
                }
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

/// Write the manifest and every file body into `writer`, close it and save the result.
///
/// `blobs` must be index-aligned with `files`.
pub async fn zip_files<W, S>(
    files: &[FileDescriptor],
    blobs: Vec<Bytes>,
    username: &str,
    mut writer: W,
    saver: &S,
) -> Result<(), ArchiveError>
where
    W: ArchiveWriter,
    S: SaveTarget,
{
    if files.len() != blobs.len() {
        return Err(ArchiveError::LengthMismatch {
            files: files.len(),
            blobs: blobs.len(),
        });
    }

    writer.add(MANIFEST_ENTRY, EntrySource::Text(build_manifest(files)))?;
    for (name, blob) in entry_names(files).iter().zip(blobs) {
        writer.add(name, EntrySource::Binary(blob))?;
    }
    let archive = writer.close()?;
    tracing::debug!(entries = files.len() + 1, bytes = archive.len(), "archive closed");

    saver.save(archive, &archive_file_name(username)).await
}
