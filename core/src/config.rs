//! Connection settings for a storage client.
//!
//! # Design
//! `ClientConfig` is built once and never mutated by the client. Identity
//! fields are `Option`s: an empty string passed at construction is stored as
//! absent, so "not configured" has a single representation.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed per-request timeout used by every operation.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Immutable connection configuration for [`crate::StorageClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Option<String>,
    client_name: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    client_key: Option<String>,
    tmp_dir: PathBuf,
    timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration.
    ///
    /// Trailing slashes are stripped from `base_url`, and a URL without an
    /// `http://` or `https://` prefix gets `https://` (or `http://` when
    /// `prefer_secure` is false).
    pub fn new(
        base_url: Option<&str>,
        client_name: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
        client_key: Option<&str>,
        prefer_secure: bool,
    ) -> Self {
        Self {
            base_url: normalize_base_url(base_url, prefer_secure),
            client_name: non_empty(client_name),
            client_id: non_empty(client_id),
            client_secret: non_empty(client_secret),
            client_key: non_empty(client_key),
            tmp_dir: env::temp_dir(),
            timeout: SUBMIT_TIMEOUT,
        }
    }

    /// Read the configuration from `STORAGE_*` environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        let prefer_secure = var("STORAGE_PREFER_SECURE")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        let config = Self::new(
            var("STORAGE_URL").as_deref(),
            var("STORAGE_CLIENT_NAME").as_deref(),
            var("STORAGE_CLIENT_ID").as_deref(),
            var("STORAGE_CLIENT_SECRET").as_deref(),
            var("STORAGE_CLIENT_KEY").as_deref(),
            prefer_secure,
        );
        match var("STORAGE_TMP_DIR") {
            Some(dir) => config.with_tmp_dir(dir),
            None => config,
        }
    }

    /// Set the directory uploads are staged in before sending.
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = dir.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn client_key(&self) -> Option<&str> {
        self.client_key.as_deref()
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn normalize_base_url(base_url: Option<&str>, prefer_secure: bool) -> Option<String> {
    let trimmed = base_url?.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(trimmed.to_string());
    }
    let scheme = if prefer_secure { "https" } else { "http" };
    Some(format!("{scheme}://{trimmed}"))
}
