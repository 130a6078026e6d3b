//! Error types for archive packaging operations.
//!
//! Covers I/O failures while reading assets, ZIP encoding problems, and the
//! final rename that publishes a finished archive.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from archive packaging.
///
/// Whenever one of these is returned, no archive exists at the final output
/// path for this run; the partially written temporary file is removed.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}")]
    CreateOutputDir {
        /// The directory that could not be created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source asset could not be read (or was not UTF-8 text when it had
    /// to be synchronized).
    #[error("failed to read asset {path}")]
    ReadAsset {
        /// The asset on disk.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing archive bytes failed (disk full, permission denied, ...).
    #[error("failed to write archive data for {path}")]
    Write {
        /// The archive being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The ZIP encoder rejected an operation.
    #[error("ZIP encoding error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The same archive path would be written twice.
    #[error("duplicate archive entry: {name}")]
    DuplicateEntry {
        /// The repeated relative path.
        name: String,
    },

    /// The finished archive could not be moved into place.
    #[error("failed to finalize archive at {path}")]
    Persist {
        /// The intended output path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
