//! Manifest template loading and version injection.
//!
//! A project may ship `manifest.template.json` at its root. When present it
//! is parsed, its `version` field is overwritten with the release version,
//! and the result is emitted into the archive as `manifest.json`. The
//! template's optional `excludeFiles` array feeds the exclusion policy.
//!
//! ```json
//! {
//!   "name": "CommandSage",
//!   "version": "0.0.0",
//!   "excludeFiles": ["CommandSage/Dev.lua"]
//! }
//! ```

use super::release_version::ReleaseVersion;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fs;
use thiserror::Error;

/// Name of the generated manifest inside the archive.
pub const MANIFEST_ENTRY_NAME: &str = "manifest.json";

/// Key overwritten with the release version.
const VERSION_KEY: &str = "version";

/// Key listing relative paths to leave out of the archive.
const EXCLUDE_FILES_KEY: &str = "excludeFiles";

/// Errors arising from manifest template loading.
#[derive(Debug, Error)]
pub enum ManifestParseError {
    /// The template exists but could not be read.
    #[error("failed to read manifest template {path}")]
    Read {
        /// The template path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The template is not well-formed JSON.
    #[error("manifest template {path} is not valid JSON: {source}")]
    Json {
        /// The template path.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The template parsed, but its top level is not an object.
    #[error("manifest template {path} must be a JSON object, found {found}")]
    NotAnObject {
        /// The template path.
        path: Utf8PathBuf,
        /// The JSON type found at the top level.
        found: &'static str,
    },

    /// The versioned manifest could not be serialized.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A parsed template: the document plus its declared exclusions.
///
/// Unknown keys are carried through untouched; only `version` and
/// `excludeFiles` have meaning to the packager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestTemplate {
    document: Map<String, Value>,
    exclude_files: Vec<String>,
}

impl ManifestTemplate {
    /// Parse and validate template text.
    ///
    /// `path` is used for error messages only.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestParseError::Json`] for malformed JSON and
    /// [`ManifestParseError::NotAnObject`] when the top level is not an
    /// object.
    pub fn parse(path: &Utf8Path, raw: &str) -> Result<Self, ManifestParseError> {
        let value: Value = serde_json::from_str(raw).map_err(|source| ManifestParseError::Json {
            path: path.to_owned(),
            source,
        })?;
        let Value::Object(document) = value else {
            return Err(ManifestParseError::NotAnObject {
                path: path.to_owned(),
                found: json_type_name(&value),
            });
        };
        let exclude_files = extract_excludes(path, document.get(EXCLUDE_FILES_KEY));
        Ok(Self {
            document,
            exclude_files,
        })
    }

    /// The template's `excludeFiles`, or empty when absent or malformed.
    #[must_use]
    pub fn exclude_files(&self) -> &[String] {
        &self.exclude_files
    }

    /// The `version` the template was authored with, if it is a string.
    #[must_use]
    pub fn template_version(&self) -> Option<&str> {
        self.document.get(VERSION_KEY).and_then(Value::as_str)
    }

    /// Overwrite `version` and serialize with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestParseError::Serialize`] if serialization fails.
    pub fn render(&self, version: &ReleaseVersion) -> Result<String, ManifestParseError> {
        let mut document = self.document.clone();
        document.insert(
            VERSION_KEY.to_owned(),
            Value::String(version.as_str().to_owned()),
        );
        // serde_json's default `Map` is ordered by key, so output is stable.
        let mut rendered = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(ManifestParseError::Serialize)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

/// The versioned manifest ready for injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedManifest {
    /// Serialized `manifest.json` content.
    pub content: String,
    /// Relative paths the template asked to exclude.
    pub excludes: Vec<String>,
}

/// Load the template at `template_path` and stamp it with `version`.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns [`ManifestParseError`] when the file exists but cannot be read,
/// is not valid JSON, or is not a JSON object.
///
/// # Examples
///
/// ```
/// use addon_packager::artefact::manifest::load;
/// use addon_packager::artefact::release_version::ReleaseVersion;
/// use camino::Utf8Path;
///
/// let version = ReleaseVersion::try_from("1.2.3").expect("valid version");
/// let missing = load(Utf8Path::new("/no/such/manifest.template.json"), &version)
///     .expect("absence is not an error");
/// assert!(missing.is_none());
/// ```
pub fn load(
    template_path: &Utf8Path,
    version: &ReleaseVersion,
) -> Result<Option<LoadedManifest>, ManifestParseError> {
    let raw = match fs::read_to_string(template_path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no manifest template at {template_path}");
            return Ok(None);
        }
        Err(source) => {
            return Err(ManifestParseError::Read {
                path: template_path.to_owned(),
                source,
            });
        }
    };

    let template = ManifestTemplate::parse(template_path, &raw)?;
    let content = template.render(version)?;
    Ok(Some(LoadedManifest {
        content,
        excludes: template.exclude_files().to_vec(),
    }))
}

/// Read `excludeFiles` leniently: anything but an array of strings is empty.
fn extract_excludes(path: &Utf8Path, value: Option<&Value>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    let strings: Option<Vec<String>> = value.as_array().and_then(|items| {
        items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect()
    });
    strings.unwrap_or_else(|| {
        warn!("ignoring malformed `{EXCLUDE_FILES_KEY}` in {path}: expected an array of strings");
        Vec::new()
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
