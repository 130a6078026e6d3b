//! Operator-facing output for the packager CLI.
//!
//! Progress and results go to stderr as plain lines; diagnostic detail goes
//! through `log`.

use crate::artefact::packaging::{ArchiveHandle, FileListing};
use crate::artefact::upload::UploadResult;
use crate::release::ReleaseMetadata;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format a dry-run listing.
///
/// # Example
///
/// ```
/// use addon_packager::artefact::packaging::FileListing;
/// use addon_packager::output::listing_text;
/// use camino::Utf8PathBuf;
///
/// let listing = FileListing {
///     archive_path: Utf8PathBuf::from("dist/CommandSage-1.0.0.zip"),
///     files: vec!["CommandSage/CommandSage.toc".to_owned()],
///     manifest_included: false,
/// };
/// let text = listing_text(&listing);
/// assert!(text.starts_with("Dry run - would package 1 file into dist/CommandSage-1.0.0.zip"));
/// assert!(text.contains("  CommandSage/CommandSage.toc"));
/// ```
#[must_use]
pub fn listing_text(listing: &FileListing) -> String {
    let count = listing.files.len();
    let plural = if count == 1 { "file" } else { "files" };
    let mut text = format!(
        "Dry run - would package {count} {plural} into {}",
        listing.archive_path
    );
    if listing.manifest_included {
        text.push_str("\n  manifest.json (generated)");
    }
    for file in &listing.files {
        text.push_str("\n  ");
        text.push_str(file);
    }
    text
}

/// Format the summary printed after a successful build.
#[must_use]
pub fn archive_summary(handle: &ArchiveHandle) -> String {
    let mut text = format!(
        "Packaged {} ({} bytes, {} entries)\nSHA-256: {}",
        handle.path,
        handle.size_bytes,
        handle.entries.len(),
        handle.sha256
    );
    for warning in &handle.warnings {
        text.push_str("\nwarning: ");
        text.push_str(&warning.to_string());
    }
    text
}

/// Format release metadata for display before upload.
///
/// # Errors
///
/// Returns the serializer error.
pub fn metadata_text(metadata: &ReleaseMetadata) -> Result<String, serde_json::Error> {
    Ok(format!("Release metadata:\n{}", metadata.to_pretty_json()?))
}

/// Format the endpoint's response to a successful upload.
#[must_use]
pub fn upload_text(result: &UploadResult) -> String {
    let body = result.body.trim();
    if body.is_empty() {
        format!("Upload complete (HTTP {})", result.status)
    } else {
        format!("Upload complete (HTTP {}):\n{body}", result.status)
    }
}
