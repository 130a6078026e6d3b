//! Exclusion policy for the packaging walk.
//!
//! Exclusions come from three places: the built-in list (which always holds
//! the manifest template itself), the manifest template's `excludeFiles`
//! array, and the comma-separated operator override. The effective policy
//! is their union; no source can remove an entry another source added.

use std::collections::BTreeSet;

/// File name of the optional manifest template at the project root.
pub const MANIFEST_TEMPLATE_FILE: &str = "manifest.template.json";

/// Directory names pruned anywhere in the tree.
pub const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &[
    ".git",
    ".github",
    ".idea",
    ".run",
    "dist",
    "node_modules",
    "scripts",
    "tests",
];

/// The merged exclusion rules for one packaging run.
///
/// # Examples
///
/// ```
/// use addon_packager::exclusion::{ExclusionPolicy, MANIFEST_TEMPLATE_FILE};
///
/// let policy = ExclusionPolicy::resolve(
///     &[MANIFEST_TEMPLATE_FILE.to_owned()],
///     &["CommandSage/Dev.lua".to_owned()],
///     Some("notes.xml, CommandSage/Debug.lua"),
/// );
/// assert!(policy.excludes_path("manifest.template.json"));
/// assert!(policy.excludes_path("CommandSage/Dev.lua"));
/// assert!(policy.excludes_path("CommandSage/Debug.lua"));
/// assert!(policy.excludes_directory(".git"));
/// assert!(!policy.excludes_path("CommandSage/Core.lua"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPolicy {
    directory_names: BTreeSet<String>,
    relative_directories: BTreeSet<String>,
    explicit_relative_paths: BTreeSet<String>,
    extra_from_environment: Vec<String>,
}

impl ExclusionPolicy {
    /// Merge the built-in, manifest, and operator exclusions.
    ///
    /// `builtin_file_excludes` and `manifest_excludes` are exact relative
    /// paths. `environment_excludes` is the raw comma-separated override;
    /// items are trimmed and blanks dropped. The default directory-name
    /// list is always applied.
    #[must_use]
    pub fn resolve(
        builtin_file_excludes: &[String],
        manifest_excludes: &[String],
        environment_excludes: Option<&str>,
    ) -> Self {
        let extra_from_environment = environment_excludes
            .map(split_override)
            .unwrap_or_default();

        let explicit_relative_paths = builtin_file_excludes
            .iter()
            .chain(manifest_excludes)
            .map(|path| normalize_relative_path(path))
            .filter(|path| !path.is_empty())
            .collect();

        Self {
            directory_names: DEFAULT_EXCLUDED_DIRECTORIES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            relative_directories: BTreeSet::new(),
            explicit_relative_paths,
            extra_from_environment,
        }
    }

    /// Prune the one directory at `relative_path` from the project root.
    ///
    /// Other directories sharing its final name are still walked.
    #[must_use]
    pub fn with_relative_directory(mut self, relative_path: &str) -> Self {
        let normalized = normalize_relative_path(relative_path);
        let trimmed = normalized.trim_end_matches('/');
        if !trimmed.is_empty() {
            self.relative_directories.insert(trimmed.to_owned());
        }
        self
    }

    /// Return `true` when a directory with this name must not be entered.
    #[must_use]
    pub fn excludes_directory(&self, name: &str) -> bool {
        self.directory_names.contains(name)
    }

    /// Return `true` when the directory at this relative path is pruned.
    #[must_use]
    pub fn excludes_relative_directory(&self, relative_path: &str) -> bool {
        self.relative_directories.contains(relative_path)
    }

    /// Return `true` when the slash-normalized relative path is excluded.
    #[must_use]
    pub fn excludes_path(&self, relative_path: &str) -> bool {
        self.explicit_relative_paths.contains(relative_path)
            || self
                .extra_from_environment
                .iter()
                .any(|extra| extra == relative_path)
    }

    /// Directory names pruned by this policy.
    #[must_use]
    pub fn directory_names(&self) -> &BTreeSet<String> {
        &self.directory_names
    }

    /// Exact relative paths from the built-in and manifest sources.
    #[must_use]
    pub fn explicit_relative_paths(&self) -> &BTreeSet<String> {
        &self.explicit_relative_paths
    }

    /// Operator overrides, in the order they were supplied.
    #[must_use]
    pub fn extra_from_environment(&self) -> &[String] {
        &self.extra_from_environment
    }
}

/// Split a comma-separated override into trimmed, normalized paths.
fn split_override(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_relative_path)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Normalize a relative path to the walker's forward-slash form.
///
/// Backslashes become slashes, and leading `./` segments and slashes are
/// stripped so `./CommandSage\Dev.lua` matches `CommandSage/Dev.lua`.
#[must_use]
pub fn normalize_relative_path(path: &str) -> String {
    let slashed = path.trim().replace('\\', "/");
    let mut rest = slashed.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn builtin() -> Vec<String> {
        vec![MANIFEST_TEMPLATE_FILE.to_owned()]
    }

    #[test]
    fn builtin_always_excludes_manifest_template() {
        let policy = ExclusionPolicy::resolve(&builtin(), &[], None);
        assert!(policy.excludes_path(MANIFEST_TEMPLATE_FILE));
    }

    #[test]
    fn manifest_excludes_are_unioned() {
        let policy =
            ExclusionPolicy::resolve(&builtin(), &["CommandSage/Dev.lua".to_owned()], None);
        assert!(policy.excludes_path(MANIFEST_TEMPLATE_FILE));
        assert!(policy.excludes_path("CommandSage/Dev.lua"));
    }

    #[test]
    fn environment_override_is_split_and_trimmed() {
        let policy = ExclusionPolicy::resolve(&builtin(), &[], Some(" a.lua ,b/c.xml,, "));
        assert_eq!(policy.extra_from_environment(), &["a.lua", "b/c.xml"]);
        assert!(policy.excludes_path("a.lua"));
        assert!(policy.excludes_path("b/c.xml"));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    #[case::only_commas(Some(" , ,"))]
    fn empty_override_contributes_nothing(#[case] raw: Option<&str>) {
        let policy = ExclusionPolicy::resolve(&builtin(), &[], raw);
        assert!(policy.extra_from_environment().is_empty());
        assert!(policy.excludes_path(MANIFEST_TEMPLATE_FILE));
    }

    #[test]
    fn override_cannot_remove_builtin_entries() {
        let policy = ExclusionPolicy::resolve(&builtin(), &[], Some("other.lua"));
        assert!(policy.excludes_path(MANIFEST_TEMPLATE_FILE));
        assert!(policy.excludes_directory(".git"));
    }

    #[rstest]
    #[case::dot_slash("./CommandSage/Dev.lua")]
    #[case::backslash("CommandSage\\Dev.lua")]
    #[case::leading_slash("/CommandSage/Dev.lua")]
    fn manifest_paths_are_slash_normalized(#[case] raw: &str) {
        let policy = ExclusionPolicy::resolve(&builtin(), &[raw.to_owned()], None);
        assert!(policy.excludes_path("CommandSage/Dev.lua"));
    }

    #[rstest]
    #[case(".git")]
    #[case("tests")]
    #[case("scripts")]
    #[case("dist")]
    fn default_directory_names_are_pruned(#[case] name: &str) {
        let policy = ExclusionPolicy::resolve(&[], &[], None);
        assert!(policy.excludes_directory(name));
    }

    #[test]
    fn relative_directory_is_pruned_by_full_path_only() {
        let policy = ExclusionPolicy::resolve(&[], &[], None).with_relative_directory("build/Media");
        assert!(policy.excludes_relative_directory("build/Media"));
        assert!(!policy.excludes_relative_directory("CommandSage/Media"));
        assert!(!policy.excludes_directory("Media"));
    }

    #[rstest]
    #[case::dot_slash("./out/")]
    #[case::backslash("out\\")]
    fn relative_directory_is_normalized(#[case] raw: &str) {
        let policy = ExclusionPolicy::resolve(&[], &[], None).with_relative_directory(raw);
        assert!(policy.excludes_relative_directory("out"));
    }

    #[test]
    fn empty_relative_directory_is_ignored() {
        let policy = ExclusionPolicy::resolve(&[], &[], None).with_relative_directory("./");
        assert_eq!(policy, ExclusionPolicy::resolve(&[], &[], None));
    }

    #[test]
    fn matching_is_exact_not_prefix() {
        let policy = ExclusionPolicy::resolve(&["Core.lua".to_owned()], &[], None);
        assert!(!policy.excludes_path("CommandSage/Core.lua"));
        assert!(!policy.excludes_path("Core.lua.bak"));
    }
}
