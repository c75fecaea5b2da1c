//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe requests and responses as plain data. The client
//! builds `HttpRequest` values and parses `HttpResponse` values; a
//! `Transport` performs the actual round-trip. Every storage command is a
//! POST, so a request is just a URL, its form fields and an optional file.

use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// A file attached to a multipart request.
///
/// The bytes stay on disk until the request is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub path: PathBuf,
}

/// A storage command described as plain data.
///
/// Built by `StorageClient::build_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Value of the first form field named `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Encode fields and file as a `multipart/form-data` body.
    ///
    /// Reads the attached file from disk.
    pub fn multipart_body(&self, boundary: &str) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        for (name, value) in &self.fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape(name))
                    .as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        if let Some(file) = &self.file {
            let content = fs::read(&file.path)?;
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    escape(&file.field),
                    escape(&file.filename)
                )
                .as_bytes(),
            );
            body.extend_from_slice(
                format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes(),
            );
            body.extend_from_slice(&content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Ok(body)
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// An HTTP response described as plain data.
///
/// The body is kept as raw bytes; stored documents need not be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
