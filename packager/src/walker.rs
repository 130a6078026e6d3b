//! Lazy, deterministic traversal of the project tree.
//!
//! The walker yields every regular file under the root whose directory chain
//! survives the [`ExclusionPolicy`], whose relative path is not excluded, and
//! whose extension is on the [`ExtensionAllowList`]. Entries inside each
//! directory are visited in file-name order, so two walks of an unchanged
//! tree always produce the same sequence.

use crate::exclusion::ExclusionPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::collections::BTreeSet;
use std::fs;
use thiserror::Error;

/// Extensions packaged when no override is configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "toc", "lua", "xml", "blp", "tga", "png", "jpg", "jpeg", "gif", "jar", "zip",
];

/// Errors raised while reading the project tree.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The root directory does not exist.
    #[error("project root {path} does not exist")]
    RootNotFound {
        /// The configured root.
        path: Utf8PathBuf,
    },

    /// The root exists but is not a directory.
    #[error("project root {path} is not a directory")]
    RootNotDirectory {
        /// The configured root.
        path: Utf8PathBuf,
    },

    /// A directory listing could not be read.
    #[error("failed to read directory {path}")]
    ReadDir {
        /// The directory that could not be listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File metadata could not be read.
    #[error("failed to read metadata for {path}")]
    Metadata {
        /// The path whose metadata was requested.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A directory entry's name is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// The set of lowercase extensions eligible for packaging.
///
/// # Examples
///
/// ```
/// use addon_packager::walker::ExtensionAllowList;
///
/// let list = ExtensionAllowList::from_csv(".TOC, lua");
/// assert!(list.contains("toc"));
/// assert!(list.contains("lua"));
/// assert!(!list.contains("jar"));
/// assert!(ExtensionAllowList::default().contains("jar"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAllowList(BTreeSet<String>);

impl ExtensionAllowList {
    /// Build an allow-list from extensions with or without leading dots.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    /// Build an allow-list from a comma-separated override.
    #[must_use]
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Return `true` when `extension` (lowercase, no dot) is allowed.
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(extension)
    }

    /// Return `true` when nothing is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the allowed extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ExtensionAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS)
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// A file selected for packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Location on disk.
    pub absolute_path: Utf8PathBuf,
    /// Path relative to the project root, always `/`-separated.
    pub relative_path: String,
    /// Lowercase extension without the leading dot.
    pub extension: String,
}

/// Start a fresh walk of `root`.
///
/// The root is validated eagerly so a missing or unreadable tree fails
/// before any entry is produced.
///
/// # Errors
///
/// Returns [`WalkError`] when the root is missing, is not a directory, or
/// cannot be listed.
///
/// # Examples
///
/// ```
/// use addon_packager::exclusion::ExclusionPolicy;
/// use addon_packager::walker::{walk, ExtensionAllowList};
/// use camino::Utf8Path;
///
/// let policy = ExclusionPolicy::resolve(&[], &[], None);
/// let allow = ExtensionAllowList::default();
/// assert!(walk(Utf8Path::new("/definitely/not/here"), &policy, &allow).is_err());
/// ```
pub fn walk<'a>(
    root: &Utf8Path,
    policy: &'a ExclusionPolicy,
    allow_list: &'a ExtensionAllowList,
) -> Result<Walk<'a>, WalkError> {
    let metadata = fs::metadata(root).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            WalkError::RootNotFound {
                path: root.to_owned(),
            }
        } else {
            WalkError::Metadata {
                path: root.to_owned(),
                source,
            }
        }
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::RootNotDirectory {
            path: root.to_owned(),
        });
    }

    let top = read_directory(root)?;
    debug!("walking {root} ({} top-level entries)", top.len());
    Ok(Walk {
        root: root.to_owned(),
        policy,
        allow_list,
        stack: vec![top.into_iter()],
    })
}

/// Walk `root` to completion, stopping at the first error.
///
/// # Errors
///
/// Returns the first [`WalkError`] encountered; no partial listing is
/// returned.
pub fn collect_entries(
    root: &Utf8Path,
    policy: &ExclusionPolicy,
    allow_list: &ExtensionAllowList,
) -> Result<Vec<FileEntry>, WalkError> {
    walk(root, policy, allow_list)?.collect()
}

/// One directory child, resolved through symlinks.
#[derive(Debug)]
struct DirItem {
    path: Utf8PathBuf,
    name: String,
    is_dir: bool,
}

/// An in-progress depth-first walk. Created by [`walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    root: Utf8PathBuf,
    policy: &'a ExclusionPolicy,
    allow_list: &'a ExtensionAllowList,
    stack: Vec<std::vec::IntoIter<DirItem>>,
}

impl Walk<'_> {
    fn accept_file(&self, item: &DirItem) -> Option<FileEntry> {
        let relative_path = relative_to(&self.root, &item.path);
        if self.policy.excludes_path(&relative_path) {
            debug!("skipping excluded file: {relative_path}");
            return None;
        }

        let extension = item
            .path
            .extension()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self.allow_list.contains(&extension) {
            trace!("skipping {relative_path}: extension not allowed");
            return None;
        }

        Some(FileEntry {
            absolute_path: item.path.clone(),
            relative_path,
            extension,
        })
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<FileEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let Some(item) = top.next() else {
                self.stack.pop();
                continue;
            };

            if item.is_dir {
                let relative_path = relative_to(&self.root, &item.path);
                if self.policy.excludes_directory(&item.name)
                    || self.policy.excludes_relative_directory(&relative_path)
                {
                    debug!("pruning directory {relative_path}");
                    continue;
                }
                match read_directory(&item.path) {
                    Ok(children) => self.stack.push(children.into_iter()),
                    Err(err) => {
                        self.stack.clear();
                        return Some(Err(err));
                    }
                }
                continue;
            }

            if let Some(entry) = self.accept_file(&item) {
                return Some(Ok(entry));
            }
        }
    }
}

/// List `dir`, following symlinks, sorted by file name.
fn read_directory(dir: &Utf8Path) -> Result<Vec<DirItem>, WalkError> {
    let read_dir = fs::read_dir(dir).map_err(|source| WalkError::ReadDir {
        path: dir.to_owned(),
        source,
    })?;

    let mut items = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(|source| WalkError::ReadDir {
            path: dir.to_owned(),
            source,
        })?;
        let path = Utf8PathBuf::from_path_buf(dir_entry.path()).map_err(|raw| {
            WalkError::NonUtf8Path {
                path: raw.to_string_lossy().into_owned(),
            }
        })?;
        let metadata = fs::metadata(&path).map_err(|source| WalkError::Metadata {
            path: path.clone(),
            source,
        })?;
        let name = path.file_name().unwrap_or_default().to_owned();
        items.push(DirItem {
            path,
            name,
            is_dir: metadata.is_dir(),
        });
    }

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

/// Render `path` relative to `root` with `/` separators.
fn relative_to(root: &Utf8Path, path: &Utf8Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
