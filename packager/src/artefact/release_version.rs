//! Release version and project name newtypes for archive naming.
//!
//! Both values end up inside `<ProjectName>-<version>.zip` and inside the
//! `## Version:` line of every synchronized text asset, so they must be
//! non-empty, single-line, and free of path separators.

use super::error::{ArtefactError, Result};
use std::fmt;

/// Version used when neither the command line nor the environment set one.
pub const FALLBACK_VERSION: &str = "0.0.0";

/// Project name used when no override is configured.
pub const DEFAULT_PROJECT_NAME: &str = "CommandSage";

/// A validated release version such as `1.2.3` or `2.0.0-beta.1`.
///
/// # Examples
///
/// ```
/// use addon_packager::artefact::release_version::ReleaseVersion;
///
/// let version: ReleaseVersion = "1.2.3".try_into().expect("valid version");
/// assert_eq!(version.as_str(), "1.2.3");
/// assert!(ReleaseVersion::try_from("1.2/3").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the version used when nothing else was configured.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_VERSION.to_owned())
    }
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        validate_component(trimmed).map_err(|reason| ArtefactError::InvalidVersion {
            value: value.to_owned(),
            reason,
        })?;
        Ok(Self(trimmed.to_owned()))
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for ReleaseVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated project name, e.g. `CommandSage`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectName {
    fn default() -> Self {
        Self(DEFAULT_PROJECT_NAME.to_owned())
    }
}

impl TryFrom<&str> for ProjectName {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        validate_component(trimmed).map_err(|reason| ArtefactError::InvalidProjectName {
            value: value.to_owned(),
            reason,
        })?;
        Ok(Self(trimmed.to_owned()))
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `value` can be embedded in a filename and a single text line.
fn validate_component(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_owned());
    }
    if value == "." || value == ".." {
        return Err("must not be a relative path marker".to_owned());
    }
    if let Some(bad) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
    {
        return Err(format!("contains forbidden character {bad:?}"));
    }
    Ok(())
}
