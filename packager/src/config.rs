//! Run configuration read from the environment.
//!
//! Process state is read exactly once, by [`ReleaseConfig::from_env`]; every
//! other component receives the resulting record. Blank values are treated
//! as unset. `ADDON_VERSION` takes precedence over the `--output` flag.

use crate::artefact::error::ArtefactError;
use crate::artefact::release_version::{ProjectName, ReleaseVersion};
use crate::artefact::upload::{Credentials, DEFAULT_ENDPOINT};
use crate::release::ReleaseType;
use crate::walker::ExtensionAllowList;
use thiserror::Error;

/// Release version used when no override is given.
pub const ADDON_VERSION: &str = "ADDON_VERSION";
/// Value written to `## Interface:` lines.
pub const INTERFACE_VERSION: &str = "INTERFACE_VERSION";
/// Comma-separated game versions for the release metadata.
pub const GAME_VERSIONS: &str = "GAME_VERSIONS";
/// Comma-separated extra relative paths to exclude.
pub const CURSEFORGE_EXCLUDES: &str = "CURSEFORGE_EXCLUDES";
/// Remote project identifier.
pub const CURSEFORGE_PROJECT_ID: &str = "CURSEFORGE_PROJECT_ID";
/// API token.
pub const CURSEFORGE_TOKEN: &str = "CURSEFORGE_TOKEN";
/// Project name used in the archive name and display name.
pub const ADDON_PROJECT_NAME: &str = "ADDON_PROJECT_NAME";
/// API base URL.
pub const CURSEFORGE_API_URL: &str = "CURSEFORGE_API_URL";
/// `alpha`, `beta`, or `release`.
pub const RELEASE_TYPE: &str = "RELEASE_TYPE";
/// Comma-separated file extensions eligible for packaging.
pub const ALLOWED_EXTENSIONS: &str = "ALLOWED_EXTENSIONS";
/// Changelog text; takes precedence over `CHANGELOG.md`.
pub const CHANGELOG: &str = "CHANGELOG";

/// A configuration value that failed validation.
#[derive(Debug, Error)]
#[error("invalid {key}")]
pub struct ConfigError {
    /// The offending variable or flag.
    pub key: &'static str,
    /// Why it was rejected.
    #[source]
    pub source: ArtefactError,
}

/// Everything a pipeline run needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Release version from the environment, if any.
    pub version: Option<ReleaseVersion>,
    /// Interface version to stamp, if any.
    pub interface_version: Option<ReleaseVersion>,
    /// Game-version override for the release metadata.
    pub game_versions: Option<Vec<String>>,
    /// Raw comma-separated exclusion overrides.
    pub environment_excludes: Option<String>,
    /// Upload credentials.
    pub credentials: Credentials,
    /// Project name.
    pub project_name: ProjectName,
    /// Upload API base URL.
    pub api_url: String,
    /// Release channel.
    pub release_type: ReleaseType,
    /// Extensions eligible for packaging.
    pub allowed_extensions: ExtensionAllowList,
    /// Changelog override.
    pub changelog: Option<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            version: None,
            interface_version: None,
            game_versions: None,
            environment_excludes: None,
            credentials: Credentials::default(),
            project_name: ProjectName::default(),
            api_url: DEFAULT_ENDPOINT.to_owned(),
            release_type: ReleaseType::default(),
            allowed_extensions: ExtensionAllowList::default(),
            changelog: None,
        }
    }
}

impl ReleaseConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a value that fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a value that fails validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_packager::config::ReleaseConfig;
    ///
    /// let config = ReleaseConfig::from_lookup(|key| match key {
    ///     "ADDON_VERSION" => Some("1.2.3".to_owned()),
    ///     "GAME_VERSIONS" => Some("11.0.2, 11.0.5".to_owned()),
    ///     _ => None,
    /// })
    /// .expect("valid configuration");
    /// assert_eq!(config.version.expect("version set").as_str(), "1.2.3");
    /// assert_eq!(
    ///     config.game_versions,
    ///     Some(vec!["11.0.2".to_owned(), "11.0.5".to_owned()])
    /// );
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            version: get(ADDON_VERSION)
                .map(|v| parse_version(ADDON_VERSION, &v))
                .transpose()?,
            interface_version: get(INTERFACE_VERSION)
                .map(|v| parse_version(INTERFACE_VERSION, &v))
                .transpose()?,
            game_versions: get(GAME_VERSIONS)
                .map(|raw| split_csv(&raw))
                .filter(|versions| !versions.is_empty()),
            environment_excludes: get(CURSEFORGE_EXCLUDES),
            credentials: Credentials {
                project_id: get(CURSEFORGE_PROJECT_ID),
                token: get(CURSEFORGE_TOKEN),
            },
            project_name: get(ADDON_PROJECT_NAME)
                .map(|v| {
                    ProjectName::try_from(v.as_str()).map_err(|source| ConfigError {
                        key: ADDON_PROJECT_NAME,
                        source,
                    })
                })
                .transpose()?
                .unwrap_or(defaults.project_name),
            api_url: get(CURSEFORGE_API_URL).unwrap_or(defaults.api_url),
            release_type: get(RELEASE_TYPE)
                .map(|v| {
                    v.parse::<ReleaseType>().map_err(|source| ConfigError {
                        key: RELEASE_TYPE,
                        source,
                    })
                })
                .transpose()?
                .unwrap_or_default(),
            allowed_extensions: get(ALLOWED_EXTENSIONS)
                .map(|raw| ExtensionAllowList::from_csv(&raw))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.allowed_extensions),
            changelog: get(CHANGELOG),
        })
    }

    /// The version for this run: `ADDON_VERSION`, then `cli_override`,
    /// then `0.0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the override is consulted and is not a
    /// valid version.
    pub fn resolve_version(
        &self,
        cli_override: Option<&str>,
    ) -> Result<ReleaseVersion, ConfigError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        cli_override
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| Ok(ReleaseVersion::fallback()), |raw| parse_version("--output", raw))
    }
}

fn parse_version(key: &'static str, raw: &str) -> Result<ReleaseVersion, ConfigError> {
    ReleaseVersion::try_from(raw).map_err(|source| ConfigError { key, source })
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
