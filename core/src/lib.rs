//! Synchronous client for a remote asset and document store.
//!
//! # Overview
//! Every command is a single POST against the storage service: store, remove
//! and check assets; store, retrieve, remove and check documents. Replies are
//! normalized into a uniform `CommandResult`, and `asset_link` builds public
//! asset URLs without touching the network.
//!
//! # Design
//! - `ClientConfig` is immutable and shared by every call.
//! - Each command is split into `build_*` (produces an `HttpRequest`) and a
//!   parse step (consumes an `HttpResponse`); a `Transport` performs the I/O
//!   in between, so the request contract is testable without a server.
//! - Uploads are staged as temporary files that are removed on every exit
//!   path.
//! - Local failures surface as failed `CommandResult`s, except in
//!   `retrieve_doc`, which returns the raw body or the error.
//!
//! ```rust,no_run
//! use storage_core::{ClientConfig, StorageClient};
//!
//! let client = StorageClient::new(ClientConfig::new(
//!     Some("storage.example.com"),
//!     Some("web"),
//!     Some("client-id"),
//!     Some("client-secret"),
//!     Some("public-key"),
//!     true,
//! ));
//!
//! let result = client.store_asset("img/logo.png", std::fs::read("logo.png").unwrap());
//! if result.success {
//!     println!("{}", client.asset_link("img/logo.png").unwrap());
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod result;
pub mod staging;
pub mod transport;

pub use client::{parse_command, Command, StorageClient};
pub use config::{ClientConfig, SUBMIT_TIMEOUT};
pub use error::{Result, StorageError};
pub use http::{FilePart, HttpRequest, HttpResponse};
pub use result::{
    normalize, normalize_with, status_code, CommandResult, Defaults, RawResult, APP_GENERIC_ERROR,
};
pub use staging::{stage_upload, StagedUpload};
pub use transport::{Transport, UreqTransport, MAX_BODY_BYTES};
