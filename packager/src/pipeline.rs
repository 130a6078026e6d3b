//! Build and release pipeline orchestration.
//!
//! Each subcommand is a straight sequence of stages: resolve exclusions,
//! walk the tree, load the manifest template, package, and (for releases)
//! describe and upload. Stages run strictly in order and the first failure
//! aborts the run; version-token warnings are reported but never fatal.

use crate::artefact::manifest::{self, LoadedManifest};
use crate::artefact::naming::ArchiveName;
use crate::artefact::packaging::{
    ArchiveHandle, BuildOutcome, PackageParams, build_archive, package_artefact,
};
use crate::artefact::release_version::ReleaseVersion;
use crate::artefact::upload::{ReleaseTransport, UploadClient, UploadError, UploadResult};
use crate::config::ReleaseConfig;
use crate::error::{PipelineError, Result};
use crate::exclusion::{ExclusionPolicy, MANIFEST_TEMPLATE_FILE};
use crate::output::{archive_summary, listing_text, metadata_text, upload_text, write_stderr_line};
use crate::release::ReleaseMetadata;
use crate::tools::{self, CommandExecutor};
use crate::walker::{FileEntry, collect_entries};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::io::Write;

/// Changelog read when `CHANGELOG` is not set.
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Context for a pipeline run.
pub struct PipelineContext<'a> {
    /// Project root directory.
    pub root: &'a Utf8Path,
    /// Directory the archive is written to.
    pub output_dir: &'a Utf8Path,
    /// Environment-derived configuration.
    pub config: &'a ReleaseConfig,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Options for [`release`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseOptions<'a> {
    /// Version override from the command line.
    pub version_override: Option<&'a str>,
    /// Skip lint and test.
    pub skip_checks: bool,
}

/// Package the project, or list what would be packaged.
///
/// # Errors
///
/// Returns the first stage failure: configuration, manifest template,
/// tree walk, or archive writing.
pub fn build(
    context: &PipelineContext<'_>,
    version_override: Option<&str>,
    dry_run: bool,
    stderr: &mut dyn Write,
) -> Result<BuildOutcome> {
    let version = context.config.resolve_version(version_override)?;
    package(context, &version, dry_run, stderr)
}

/// Run lint and tests, then build.
///
/// # Errors
///
/// Returns [`PipelineError::Tool`] when a check fails, otherwise as
/// [`build`].
pub fn ci(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
) -> Result<ArchiveHandle> {
    run_checks(context, executor, stderr)?;
    let version = context.config.resolve_version(None)?;
    package_archive(context, &version, stderr)
}

/// Run `luacheck` over the project.
///
/// # Errors
///
/// Returns [`PipelineError::Tool`] when the linter is missing or fails.
pub fn lint(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
) -> Result<()> {
    tools::lint(executor, context.root)?;
    if !context.quiet {
        write_stderr_line(stderr, "Lint passed");
    }
    Ok(())
}

/// Run the `busted` suite, optionally only tests matching `filter`.
///
/// # Errors
///
/// Returns [`PipelineError::Tool`] when the test runner is missing or fails.
pub fn test(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    filter: Option<&str>,
    stderr: &mut dyn Write,
) -> Result<()> {
    tools::test(executor, context.root, filter)?;
    if !context.quiet {
        write_stderr_line(stderr, "Tests passed");
    }
    Ok(())
}

/// Check, build, describe, and upload a release.
///
/// Credentials are verified first so an incomplete setup fails before any
/// tool runs or any file is written.
///
/// # Errors
///
/// Returns [`PipelineError::Upload`] for missing credentials or a failed
/// upload, and the respective stage error for anything earlier.
pub fn release<T: ReleaseTransport>(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    client: &UploadClient<T>,
    options: ReleaseOptions<'_>,
    stderr: &mut dyn Write,
) -> Result<UploadResult> {
    context.config.credentials.require()?;
    let version = context.config.resolve_version(options.version_override)?;

    if options.skip_checks {
        info!("skipping lint and tests");
    } else {
        run_checks(context, executor, stderr)?;
    }

    let handle = package_archive(context, &version, stderr)?;
    let changelog = read_changelog(context)?;
    let metadata = ReleaseMetadata::build(
        &context.config.project_name,
        &version,
        changelog.as_deref(),
        context.config.game_versions.as_deref(),
        context.config.release_type,
    );
    write_stderr_line(
        stderr,
        metadata_text(&metadata).map_err(UploadError::from)?,
    );

    let result = client.upload(&handle.path, &metadata, &context.config.credentials)?;
    write_stderr_line(stderr, upload_text(&result));
    Ok(result)
}

/// Remove the output directory. Returns `false` when there was nothing to
/// remove.
///
/// Paths are compared after resolving `..` and symlinks; an output
/// directory that is the project root or one of its ancestors is refused.
///
/// # Errors
///
/// Returns [`PipelineError::Clean`] when the directory cannot be removed or
/// contains the project root.
pub fn clean(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<bool> {
    let output_dir = context.output_dir;
    let resolved = match output_dir.canonicalize_utf8() {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("{output_dir} does not exist; nothing to clean");
            return Ok(false);
        }
        Err(source) => {
            return Err(PipelineError::Clean {
                path: output_dir.to_owned(),
                source,
            });
        }
    };
    let root = context
        .root
        .canonicalize_utf8()
        .unwrap_or_else(|_| context.root.to_owned());
    if root.starts_with(&resolved) {
        return Err(PipelineError::Clean {
            path: output_dir.to_owned(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("output directory contains the project root {root}"),
            ),
        });
    }

    std::fs::remove_dir_all(output_dir).map_err(|source| PipelineError::Clean {
        path: output_dir.to_owned(),
        source,
    })?;
    if !context.quiet {
        write_stderr_line(stderr, format!("Removed {output_dir}"));
    }
    Ok(true)
}

fn run_checks(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
) -> Result<()> {
    if !context.quiet {
        write_stderr_line(stderr, "Running lint and tests...");
    }
    tools::lint(executor, context.root)?;
    tools::test(executor, context.root, None)?;
    Ok(())
}

fn package_archive(
    context: &PipelineContext<'_>,
    version: &ReleaseVersion,
    stderr: &mut dyn Write,
) -> Result<ArchiveHandle> {
    if !context.quiet {
        write_stderr_line(
            stderr,
            format!("Building {} {version}...", context.config.project_name),
        );
    }
    let plan = plan(context, version)?;
    let handle = build_archive(&plan.entries, &plan.params, plan.manifest.as_ref())?;
    if !context.quiet {
        write_stderr_line(stderr, archive_summary(&handle));
    }
    Ok(handle)
}

fn package(
    context: &PipelineContext<'_>,
    version: &ReleaseVersion,
    dry_run: bool,
    stderr: &mut dyn Write,
) -> Result<BuildOutcome> {
    if !dry_run {
        return package_archive(context, version, stderr).map(BuildOutcome::Archive);
    }
    let plan = plan(context, version)?;
    let outcome = package_artefact(&plan.entries, &plan.params, plan.manifest.as_ref(), true)?;
    if let BuildOutcome::Listing(listing) = &outcome {
        write_stderr_line(stderr, listing_text(listing));
    }
    Ok(outcome)
}

/// Everything the archive builder needs for one run.
struct PackagePlan {
    entries: Vec<FileEntry>,
    params: PackageParams,
    manifest: Option<LoadedManifest>,
}

fn plan(context: &PipelineContext<'_>, version: &ReleaseVersion) -> Result<PackagePlan> {
    let config = context.config;
    let template_path = context.root.join(MANIFEST_TEMPLATE_FILE);
    let manifest = manifest::load(&template_path, version)?;
    let policy = exclusion_policy(context, manifest.as_ref());
    let entries = collect_entries(context.root, &policy, &config.allowed_extensions)?;
    debug!("{} files selected for packaging", entries.len());

    let params = PackageParams {
        interface_version: config.interface_version.clone(),
        ..PackageParams::new(
            ArchiveName::new(config.project_name.clone(), version.clone()),
            context.output_dir.to_owned(),
        )
    };
    Ok(PackagePlan {
        entries,
        params,
        manifest,
    })
}

/// Merge the built-in, manifest, and environment exclusions, and keep a
/// custom output directory inside the tree from being packaged.
fn exclusion_policy(
    context: &PipelineContext<'_>,
    manifest: Option<&LoadedManifest>,
) -> ExclusionPolicy {
    let manifest_excludes = manifest.map(|m| m.excludes.as_slice()).unwrap_or_default();
    let policy = ExclusionPolicy::resolve(
        &[MANIFEST_TEMPLATE_FILE.to_owned()],
        manifest_excludes,
        context.config.environment_excludes.as_deref(),
    );
    match output_dir_within_root(context.root, context.output_dir) {
        Some(relative) => policy.with_relative_directory(&relative),
        None => policy,
    }
}

/// Slash-separated path of `output_dir` below `root`, if it lies inside.
fn output_dir_within_root(root: &Utf8Path, output_dir: &Utf8Path) -> Option<String> {
    let relative = output_dir.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}

fn read_changelog(context: &PipelineContext<'_>) -> Result<Option<String>> {
    if let Some(text) = &context.config.changelog {
        return Ok(Some(text.clone()));
    }
    let path: Utf8PathBuf = context.root.join(CHANGELOG_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no {CHANGELOG_FILE}; releasing with an empty changelog");
            Ok(None)
        }
        Err(source) => Err(PipelineError::Changelog { path, source }),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
