//! Release archive assembly.
//!
//! Turns the walked file set into `<ProjectName>-<version>.zip`. Text assets
//! (by default `.toc` files) are version-synchronized on the way in; every
//! other asset is stored byte-for-byte. A generated `manifest.json` is
//! injected at the archive root when a template was loaded.
//!
//! The archive is staged in a temporary file next to its destination and
//! renamed into place only after the ZIP central directory has been written,
//! so a failed run never leaves a truncated archive under the final name.

use super::manifest::{LoadedManifest, MANIFEST_ENTRY_NAME};
use super::naming::ArchiveName;
use super::packaging_error::ArchiveError;
use super::release_version::ReleaseVersion;
use crate::version_sync::{MissingTokenWarning, synchronize};
use crate::walker::FileEntry;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Extensions whose contents are version-synchronized by default.
pub const DEFAULT_SYNC_EXTENSIONS: &[&str] = &["toc"];

/// Input parameters for [`package_artefact`].
#[derive(Debug, Clone)]
pub struct PackageParams {
    /// Project name and version; determines the output filename.
    pub archive_name: ArchiveName,
    /// Value for `## Interface:` lines, when one should be written.
    pub interface_version: Option<ReleaseVersion>,
    /// Directory the archive is written to (created if absent).
    pub output_dir: Utf8PathBuf,
    /// Lowercase extensions treated as synchronizable text.
    pub sync_extensions: BTreeSet<String>,
}

impl PackageParams {
    /// Parameters with the default text-asset extensions.
    #[must_use]
    pub fn new(archive_name: ArchiveName, output_dir: Utf8PathBuf) -> Self {
        Self {
            archive_name,
            interface_version: None,
            output_dir,
            sync_extensions: DEFAULT_SYNC_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect(),
        }
    }

    /// Where the archive lands.
    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.output_dir.join(self.archive_name.filename())
    }

    fn is_text_asset(&self, entry: &FileEntry) -> bool {
        self.sync_extensions.contains(&entry.extension)
    }
}

/// A missing version token, attributed to the asset it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetWarning {
    /// Archive-relative path of the asset.
    pub relative_path: String,
    /// What was missing.
    pub warning: MissingTokenWarning,
}

impl fmt::Display for AssetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.relative_path, self.warning)
    }
}

/// A finished archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    /// Final location of the archive.
    pub path: Utf8PathBuf,
    /// Size of the archive in bytes.
    pub size_bytes: u64,
    /// Entry names in write order; `manifest.json` first when present.
    pub entries: Vec<String>,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// Non-fatal version-token warnings.
    pub warnings: Vec<AssetWarning>,
}

/// What a dry run would package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    /// Where the archive would be written.
    pub archive_path: Utf8PathBuf,
    /// Walked relative paths that would be archived.
    pub files: Vec<String>,
    /// Whether a generated `manifest.json` would be added.
    pub manifest_included: bool,
}

/// The result of [`package_artefact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A real build wrote an archive.
    Archive(ArchiveHandle),
    /// A dry run listed the files instead.
    Listing(FileListing),
}

/// Package `entries` (and the optional manifest) into a ZIP archive.
///
/// In dry-run mode nothing is read or written; the returned listing holds
/// exactly the walked paths a real build would archive.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the output directory cannot be created, an
/// asset cannot be read, or the archive cannot be written or finalized. The
/// staged temporary file is removed in every failure case.
pub fn package_artefact(
    entries: &[FileEntry],
    params: &PackageParams,
    manifest: Option<&LoadedManifest>,
    dry_run: bool,
) -> Result<BuildOutcome, ArchiveError> {
    let selected = select_entries(entries, manifest.is_some());

    if dry_run {
        return Ok(BuildOutcome::Listing(FileListing {
            archive_path: params.archive_path(),
            files: selected
                .iter()
                .map(|entry| entry.relative_path.clone())
                .collect(),
            manifest_included: manifest.is_some(),
        }));
    }

    write_archive(&selected, params, manifest).map(BuildOutcome::Archive)
}

/// Package `entries` into a ZIP archive; [`package_artefact`] without the
/// dry-run branch.
///
/// # Errors
///
/// As [`package_artefact`].
pub fn build_archive(
    entries: &[FileEntry],
    params: &PackageParams,
    manifest: Option<&LoadedManifest>,
) -> Result<ArchiveHandle, ArchiveError> {
    let selected = select_entries(entries, manifest.is_some());
    write_archive(&selected, params, manifest)
}

/// Drop walked entries that would collide with the injected manifest.
fn select_entries(entries: &[FileEntry], manifest_injected: bool) -> Vec<&FileEntry> {
    entries
        .iter()
        .filter(|entry| {
            let collides = manifest_injected && entry.relative_path == MANIFEST_ENTRY_NAME;
            if collides {
                warn!(
                    "skipping {}: replaced by the generated manifest",
                    entry.relative_path
                );
            }
            !collides
        })
        .collect()
}

fn write_archive(
    entries: &[&FileEntry],
    params: &PackageParams,
    manifest: Option<&LoadedManifest>,
) -> Result<ArchiveHandle, ArchiveError> {
    let output_dir = &params.output_dir;
    fs::create_dir_all(output_dir).map_err(|source| ArchiveError::CreateOutputDir {
        path: output_dir.clone(),
        source,
    })?;

    let archive_path = params.archive_path();
    let staged = tempfile::Builder::new()
        .prefix(".")
        .suffix(".zip.partial")
        .tempfile_in(output_dir)
        .map_err(|source| ArchiveError::Write {
            path: archive_path.clone(),
            source,
        })?;

    let mut archive = ArchiveWriter::new(staged.as_file(), &archive_path);
    if let Some(loaded) = manifest {
        archive.add(MANIFEST_ENTRY_NAME, loaded.content.as_bytes())?;
        debug!("included generated {MANIFEST_ENTRY_NAME}");
    }

    let mut warnings = Vec::new();
    for entry in entries {
        if params.is_text_asset(entry) {
            let text = fs::read_to_string(&entry.absolute_path).map_err(|source| {
                ArchiveError::ReadAsset {
                    path: entry.absolute_path.clone(),
                    source,
                }
            })?;
            let outcome = synchronize(
                &text,
                params.archive_name.version().as_str(),
                params.interface_version.as_ref().map(ReleaseVersion::as_str),
            );
            for warning in outcome.warnings {
                let attributed = AssetWarning {
                    relative_path: entry.relative_path.clone(),
                    warning,
                };
                warn!("{attributed}");
                warnings.push(attributed);
            }
            archive.add(&entry.relative_path, outcome.content.as_bytes())?;
        } else {
            archive.add_file(&entry.relative_path, &entry.absolute_path)?;
        }
    }

    let entry_names = archive.finish()?;
    publish_permissions(staged.as_file()).map_err(|source| ArchiveError::Write {
        path: archive_path.clone(),
        source,
    })?;
    staged
        .persist(&archive_path)
        .map_err(|err| ArchiveError::Persist {
            path: archive_path.clone(),
            source: err.error,
        })?;

    let size_bytes = fs::metadata(&archive_path)
        .map_err(|source| ArchiveError::Write {
            path: archive_path.clone(),
            source,
        })?
        .len();
    let sha256 = compute_sha256(&archive_path).map_err(|source| ArchiveError::Write {
        path: archive_path.clone(),
        source,
    })?;
    debug!("packaged {archive_path} ({size_bytes} bytes)");

    Ok(ArchiveHandle {
        path: archive_path,
        size_bytes,
        entries: entry_names,
        sha256,
        warnings,
    })
}

/// Widen the owner-only staged file to 0644.
#[cfg(unix)]
fn publish_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn publish_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

/// The single writer for one archive; tracks names to keep them unique.
struct ArchiveWriter<'a> {
    zip: ZipWriter<&'a File>,
    path: &'a Utf8Path,
    names: BTreeSet<String>,
    order: Vec<String>,
}

impl<'a> ArchiveWriter<'a> {
    fn new(file: &'a File, path: &'a Utf8Path) -> Self {
        Self {
            zip: ZipWriter::new(file),
            path,
            names: BTreeSet::new(),
            order: Vec::new(),
        }
    }

    fn start(&mut self, name: &str) -> Result<(), ArchiveError> {
        if !self.names.insert(name.to_owned()) {
            return Err(ArchiveError::DuplicateEntry {
                name: name.to_owned(),
            });
        }
        self.zip.start_file(name, entry_options())?;
        self.order.push(name.to_owned());
        Ok(())
    }

    fn add(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.start(name)?;
        self.zip
            .write_all(bytes)
            .map_err(|source| ArchiveError::Write {
                path: self.path.to_owned(),
                source,
            })
    }

    fn add_file(&mut self, name: &str, source_path: &Utf8Path) -> Result<(), ArchiveError> {
        let mut source_file = File::open(source_path).map_err(|source| ArchiveError::ReadAsset {
            path: source_path.to_owned(),
            source,
        })?;
        self.start(name)?;
        std::io::copy(&mut source_file, &mut self.zip).map_err(|source| ArchiveError::Write {
            path: self.path.to_owned(),
            source,
        })?;
        Ok(())
    }

    fn finish(self) -> Result<Vec<String>, ArchiveError> {
        let file = self.zip.finish()?;
        file.sync_all().map_err(|source| ArchiveError::Write {
            path: self.path.to_owned(),
            source,
        })?;
        Ok(self.order)
    }
}

/// Maximum Deflate, fixed timestamp and mode for byte-stable output.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
