//! Error types for the packager CLI.
//!
//! Each stage of a pipeline run has its own error type; [`PipelineError`]
//! wraps them and names the stage that failed so the operator can tell a
//! broken template from a rejected upload at a glance.

use crate::artefact::manifest::ManifestParseError;
use crate::artefact::packaging_error::ArchiveError;
use crate::artefact::upload::UploadError;
use crate::config::ConfigError;
use crate::tools::ToolError;
use crate::walker::WalkError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The project tree could not be read.
    #[error("file discovery failed: {0}")]
    Walk(#[from] WalkError),

    /// The manifest template exists but is unusable.
    #[error("manifest template error: {0}")]
    Manifest(#[from] ManifestParseError),

    /// The archive could not be written.
    #[error("packaging failed: {0}")]
    Archive(#[from] ArchiveError),

    /// The upload did not succeed.
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    /// A lint or test tool failed.
    #[error("quality check failed: {0}")]
    Tool(#[from] ToolError),

    /// The changelog file exists but could not be read.
    #[error("failed to read changelog {path}")]
    Changelog {
        /// The changelog path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be removed.
    #[error("failed to remove {path}")]
    Clean {
        /// The directory being removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The current working directory could not be determined.
    #[error("failed to determine the working directory")]
    WorkingDirectory(#[source] std::io::Error),

    /// A path outside the project could not be represented as UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
