//! Release metadata sent alongside an uploaded archive.
//!
//! The record is built fresh for every run and serialized as the `metadata`
//! part of the upload request. Field names follow the upload API's
//! camelCase convention.

use crate::artefact::error::ArtefactError;
use crate::artefact::naming::ArchiveName;
use crate::artefact::release_version::{ProjectName, ReleaseVersion};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Game versions targeted when no override is configured.
pub const DEFAULT_GAME_VERSIONS: &[&str] = &["1.19.2"];

/// Release channel of an uploaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Early, unstable builds.
    Alpha,
    /// Feature-complete builds awaiting wider testing.
    Beta,
    /// Stable builds.
    #[default]
    Release,
}

impl ReleaseType {
    /// The wire name of this release type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Release => "release",
        }
    }
}

impl FromStr for ReleaseType {
    type Err = ArtefactError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "release" => Ok(Self::Release),
            _ => Err(ArtefactError::UnsupportedReleaseType {
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markup of the changelog text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangelogType {
    /// Markdown.
    #[default]
    Markdown,
}

/// The release description uploaded with the archive.
///
/// # Examples
///
/// ```
/// use addon_packager::artefact::release_version::{ProjectName, ReleaseVersion};
/// use addon_packager::release::{ReleaseMetadata, ReleaseType};
///
/// let version = ReleaseVersion::try_from("1.2.3").expect("valid version");
/// let metadata = ReleaseMetadata::build(
///     &ProjectName::default(),
///     &version,
///     None,
///     None,
///     ReleaseType::Release,
/// );
/// assert_eq!(metadata.display_name, "CommandSage-1.2.3");
/// assert_eq!(metadata.game_versions, vec!["1.19.2"]);
/// assert!(metadata.changelog.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    /// Release channel.
    pub release_type: ReleaseType,
    /// Changelog body; empty when none was supplied.
    pub changelog: String,
    /// Markup of [`Self::changelog`].
    pub changelog_type: ChangelogType,
    /// `<ProjectName>-<version>`.
    pub display_name: String,
    /// Targeted game versions.
    pub game_versions: Vec<String>,
    /// Version being released; not part of the upload payload.
    #[serde(skip)]
    pub version: ReleaseVersion,
}

impl ReleaseMetadata {
    /// Assemble the metadata for one release.
    #[must_use]
    pub fn build(
        project_name: &ProjectName,
        version: &ReleaseVersion,
        changelog: Option<&str>,
        game_versions: Option<&[String]>,
        release_type: ReleaseType,
    ) -> Self {
        let display_name = ArchiveName::new(project_name.clone(), version.clone()).stem();
        let game_versions = game_versions.map_or_else(
            || {
                DEFAULT_GAME_VERSIONS
                    .iter()
                    .map(|v| (*v).to_owned())
                    .collect()
            },
            <[String]>::to_vec,
        );
        Self {
            release_type,
            changelog: changelog.unwrap_or_default().to_owned(),
            changelog_type: ChangelogType::Markdown,
            display_name,
            game_versions,
            version: version.clone(),
        }
    }

    /// Serialize as compact JSON for the upload request.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; this does not happen for well-formed
    /// records.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize as indented JSON for display to the operator.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
