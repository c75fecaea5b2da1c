//! Error types for the storage client.
//!
//! # Design
//! These are *local* failures only: the request could not be built, staged,
//! or sent. A server that answers with `success: false` is not an error at
//! this level; its reply is normalized into a failed `CommandResult` like any
//! other response.

use thiserror::Error;

/// Result alias used by the transport and staging layers.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Local failures raised while building or sending a request.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The HTTP round-trip failed (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// Staging or reading an upload on disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client was constructed without a storage URL.
    #[error("storage URL is not configured")]
    MissingBaseUrl,
}

impl StorageError {
    /// Status code associated with the failure, if the failure carries one.
    pub fn code(&self) -> Option<i64> {
        match self {
            StorageError::Transport(ureq::Error::StatusCode(status)) => Some(i64::from(*status)),
            _ => None,
        }
    }
}
