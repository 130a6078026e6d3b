//! Publishing a finished archive to the release endpoint.
//!
//! The upload is a single `multipart/form-data` POST to
//! `<endpoint>/projects/<projectId>/upload-file`, authenticated with an
//! `x-api-token` header. The form carries a JSON `metadata` part and the
//! archive as a `file` part. There is no retry: any failure is reported to
//! the caller as an [`UploadError`].
//!
//! HTTP goes through the [`ReleaseTransport`] trait so tests can observe
//! (or forbid) network calls.

use super::multipart::{self, Part};
use crate::release::ReleaseMetadata;
use camino::Utf8Path;
use log::{debug, info};
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.curseforge.com/v1";

/// Default bound on the whole upload request.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Header carrying the API token.
const TOKEN_HEADER: &str = "x-api-token";

/// Errors arising from the upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The project id or token is absent or blank.
    #[error("missing upload credentials: {missing} must be set")]
    MissingCredentials {
        /// Which credential is missing.
        missing: &'static str,
    },

    /// The endpoint answered with a non-success status.
    #[error("upload rejected with HTTP {status}: {body}")]
    Rejected {
        /// The HTTP status code.
        status: u16,
        /// The response body, verbatim.
        body: String,
    },

    /// The request could not be completed (DNS, TLS, timeout, ...).
    #[error("upload to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The archive could not be read.
    #[error("failed to read archive for upload: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata could not be serialized.
    #[error("failed to serialize release metadata: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Project id and API token.
///
/// Either may be absent; [`UploadClient::upload`] refuses to contact the
/// endpoint unless both are present and non-blank.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Remote project identifier.
    pub project_id: Option<String>,
    /// API token.
    pub token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Return `(project_id, token)` once both are present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::MissingCredentials`] naming the first missing
    /// value.
    pub fn require(&self) -> Result<(&str, &str), UploadError> {
        let project_id = non_blank(self.project_id.as_deref()).ok_or(
            UploadError::MissingCredentials {
                missing: "CURSEFORGE_PROJECT_ID",
            },
        )?;
        let token =
            non_blank(self.token.as_deref()).ok_or(UploadError::MissingCredentials {
                missing: "CURSEFORGE_TOKEN",
            })?;
        Ok((project_id, token))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A fully prepared POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Target URL.
    pub url: String,
    /// Value for the token header.
    pub token: String,
    /// `multipart/form-data; boundary=...`.
    pub content_type: String,
    /// Encoded form body.
    pub body: Vec<u8>,
}

/// What the endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// The outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// HTTP status code (2xx).
    pub status: u16,
    /// Response body, typically JSON describing the new file.
    pub body: String,
}

/// Sends a prepared upload request.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseTransport {
    /// Perform the POST and return the status and body of any response.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Transport`] when no response was received.
    fn post(&self, request: &UploadRequest) -> Result<TransportResponse, UploadError>;
}

/// `ureq`-backed transport with a global request timeout.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Build a transport whose requests are bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_TIMEOUT)
    }
}

impl ReleaseTransport for HttpTransport {
    fn post(&self, request: &UploadRequest) -> Result<TransportResponse, UploadError> {
        let response = self
            .agent
            .post(&request.url)
            .header(TOKEN_HEADER, &request.token)
            .header("Content-Type", &request.content_type)
            .header("Accept", "application/json")
            .send(request.body.as_slice())
            .map_err(|e| map_ureq_error(&request.url, &e))?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| map_ureq_error(&request.url, &e))?;
        Ok(TransportResponse { status, body })
    }
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> UploadError {
    UploadError::Transport {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

/// Uploads archives to one endpoint through a [`ReleaseTransport`].
pub struct UploadClient<T> {
    transport: T,
    endpoint: String,
}

impl<T: ReleaseTransport> UploadClient<T> {
    /// Create a client for `endpoint` (e.g. [`DEFAULT_ENDPOINT`]).
    #[must_use]
    pub fn new(transport: T, endpoint: &str) -> Self {
        Self {
            transport,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        }
    }

    /// The upload URL for `project_id`.
    #[must_use]
    pub fn upload_url(&self, project_id: &str) -> String {
        format!("{}/projects/{project_id}/upload-file", self.endpoint)
    }

    /// Upload `archive_path` with `metadata`.
    ///
    /// Credentials are checked before the archive is read or the transport
    /// is touched.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::MissingCredentials`] without any network call
    /// when credentials are incomplete, [`UploadError::Io`] when the archive
    /// cannot be read, [`UploadError::Rejected`] for a non-2xx response, and
    /// [`UploadError::Transport`] when no response arrives.
    pub fn upload(
        &self,
        archive_path: &Utf8Path,
        metadata: &ReleaseMetadata,
        credentials: &Credentials,
    ) -> Result<UploadResult, UploadError> {
        let (project_id, token) = credentials.require()?;
        let request = self.prepare(archive_path, metadata, project_id, token)?;

        info!(
            "uploading {} {archive_path} ({} bytes) to {}",
            metadata.version,
            request.body.len(),
            request.url
        );
        let response = self.transport.post(&request)?;
        debug!("upload responded with HTTP {}", response.status);

        if !(200..300).contains(&response.status) {
            return Err(UploadError::Rejected {
                status: response.status,
                body: response.body,
            });
        }
        Ok(UploadResult {
            status: response.status,
            body: response.body,
        })
    }

    fn prepare(
        &self,
        archive_path: &Utf8Path,
        metadata: &ReleaseMetadata,
        project_id: &str,
        token: &str,
    ) -> Result<UploadRequest, UploadError> {
        let archive = std::fs::read(archive_path)?;
        let filename = archive_path.file_name().unwrap_or(archive_path.as_str());
        let form = multipart::encode(&[
            Part::field("metadata", "application/json; charset=utf-8", metadata.to_json()?),
            Part::file("file", filename, "application/zip", archive),
        ]);
        Ok(UploadRequest {
            url: self.upload_url(project_id),
            token: token.to_owned(),
            content_type: form.content_type,
            body: form.body,
        })
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
