//! Error types for release naming values.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid release-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A release version string is empty or unsafe to embed in a filename.
    #[error("invalid release version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A project name is empty or unsafe to embed in a filename.
    #[error("invalid project name \"{value}\": {reason}")]
    InvalidProjectName {
        /// The rejected project name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A release type is not one of the values the upload API accepts.
    #[error("unsupported release type \"{value}\"; expected one of: alpha, beta, release")]
    UnsupportedReleaseType {
        /// The rejected release type.
        value: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
