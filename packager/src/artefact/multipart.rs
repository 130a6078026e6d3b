//! Minimal `multipart/form-data` encoding for the upload request.
//!
//! Only what the release endpoint needs: named parts with an optional
//! filename and an explicit content type, fully buffered. The boundary is
//! derived from a digest of the part bodies so identical inputs encode to
//! identical bytes.

use sha2::{Digest, Sha256};

const BOUNDARY_PREFIX: &str = "addon-packager-";

/// One named part of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: String,
    body: Vec<u8>,
}

impl Part {
    /// A plain field part.
    #[must_use]
    pub fn field(name: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_owned(),
            filename: None,
            content_type: content_type.to_owned(),
            body: body.into(),
        }
    }

    /// A file part carrying `filename` in its disposition.
    #[must_use]
    pub fn file(
        name: &str,
        filename: &str,
        content_type: &str,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: Some(filename.to_owned()),
            ..Self::field(name, content_type, body)
        }
    }
}

/// An encoded form body and the `Content-Type` header that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedForm {
    /// Value for the `Content-Type` request header.
    pub content_type: String,
    /// The encoded body.
    pub body: Vec<u8>,
}

/// Encode `parts`, in order, as `multipart/form-data`.
///
/// # Examples
///
/// ```
/// use addon_packager::artefact::multipart::{Part, encode};
///
/// let form = encode(&[Part::field("metadata", "application/json", "{}")]);
/// assert!(form.content_type.starts_with("multipart/form-data; boundary="));
/// let body = String::from_utf8(form.body).expect("ascii body");
/// assert!(body.contains("name=\"metadata\""));
/// ```
#[must_use]
pub fn encode(parts: &[Part]) -> EncodedForm {
    let boundary = boundary_for(parts);
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let disposition = match &part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                quote(&part.name),
                quote(filename)
            ),
            None => format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n",
                quote(&part.name)
            ),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(&part.body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    EncodedForm {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body,
    }
}

fn boundary_for(parts: &[Part]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.name.as_bytes());
        hasher.update(&part.body);
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("{BOUNDARY_PREFIX}{}", digest.get(..32).unwrap_or(&digest))
}

/// Escape characters that would terminate a quoted header parameter.
fn quote(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}
