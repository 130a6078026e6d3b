//! Add-on packager library.
//!
//! This crate turns an add-on source tree into a versioned ZIP archive,
//! describes the release, and publishes it to a CurseForge-style upload
//! endpoint. It is used by the `addon-packager` CLI binary and can be
//! consumed programmatically for testing or custom release workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Archive naming, manifest stamping, packaging, and upload
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Environment-derived release configuration
//! - [`error`] - Pipeline error type
//! - [`exclusion`] - Directory and file exclusion rules
//! - [`output`] - Operator-facing progress and result text
//! - [`pipeline`] - Build, check, release, and clean orchestration
//! - [`release`] - Release metadata sent alongside the archive
//! - [`tools`] - External lint and test commands
//! - [`version_sync`] - Version and interface line rewriting in text assets
//! - [`walker`] - Deterministic project tree traversal

pub mod artefact;
pub mod cli;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod output;
pub mod pipeline;
pub mod release;
pub mod tools;
pub mod version_sync;
pub mod walker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
