//! Release artefacts: naming, manifest generation, packaging, and upload.
//!
//! # Sub-modules
//!
//! - [`error`] - Validation errors for names, versions, and release types.
//! - [`release_version`] - `ReleaseVersion` and `ProjectName` newtypes.
//! - [`naming`] - `<ProjectName>-<version>.zip` naming policy.
//! - [`manifest`] - Manifest template loading and version injection.
//! - [`packaging`] - ZIP archive assembly and dry-run listings.
//! - [`packaging_error`] - Error types for packaging operations.
//! - [`multipart`] - `multipart/form-data` encoding.
//! - [`upload`] - Upload client and HTTP transport.

pub mod error;
pub mod manifest;
pub mod multipart;
pub mod naming;
pub mod packaging;
pub mod packaging_error;
pub mod release_version;
pub mod upload;
