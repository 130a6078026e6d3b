//! Archive naming policy for release artefacts.
//!
//! Every release archive is named `<ProjectName>-<version>.zip`, and the
//! same `<ProjectName>-<version>` stem doubles as the display name sent to
//! the upload API.

use super::release_version::{ProjectName, ReleaseVersion};
use std::fmt;

/// The fixed file extension for release archives.
const ARCHIVE_EXTENSION: &str = ".zip";

/// A fully-qualified release archive name.
///
/// # Examples
///
/// ```
/// use addon_packager::artefact::naming::ArchiveName;
/// use addon_packager::artefact::release_version::{ProjectName, ReleaseVersion};
///
/// let version: ReleaseVersion = "1.2.3".try_into().expect("valid version");
/// let name = ArchiveName::new(ProjectName::default(), version);
/// assert_eq!(name.to_string(), "CommandSage-1.2.3.zip");
/// assert_eq!(name.stem(), "CommandSage-1.2.3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    project: ProjectName,
    version: ReleaseVersion,
}

impl ArchiveName {
    /// Create an archive name from validated components.
    #[must_use]
    pub fn new(project: ProjectName, version: ReleaseVersion) -> Self {
        Self { project, version }
    }

    /// Return the project name component.
    #[must_use]
    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    /// Return the version component.
    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Return `<ProjectName>-<version>` without the extension.
    #[must_use]
    pub fn stem(&self) -> String {
        format!("{}-{}", self.project, self.version)
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ARCHIVE_EXTENSION}", self.stem())
    }
}
