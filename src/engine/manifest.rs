use crate::model::FileDescriptor;

/// Name of the manifest entry written first into every archive.
pub const MANIFEST_ENTRY: &str = "manifest.txt";

/// Render the human-readable manifest for an export.
///
/// One three-line block per file, in input order, separated by a blank line.
pub fn build_manifest(files: &[FileDescriptor]) -> String {
    files
        .iter()
        .map(|f| {
            format!(
                "Filename: {}\nDescription: {}\nSize: {}",
                f.name, f.description, f.size
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
