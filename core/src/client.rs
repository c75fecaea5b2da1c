//! Storage client: one POST per command, every reply normalized.
//!
//! # Design
//! `StorageClient` holds an immutable `ClientConfig` and a `Transport`. Each
//! command is split into a `build_*` method that produces an `HttpRequest`
//! and a parse step that turns the `HttpResponse` into a `CommandResult`.
//! The convenience methods (`store_asset`, `remove_doc`, ...) run both halves
//! and turn local failures into failed results, so they never return `Err`.
//! `retrieve_doc_bytes` and `retrieve_doc` are the exception: they return the
//! raw body (bytes or lossily decoded text) and propagate local failures.

use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Result, StorageError};
use crate::http::{FilePart, HttpRequest, HttpResponse};
use crate::result::{normalize_with, CommandResult, Defaults, RawResult};
use crate::staging::stage_upload;
use crate::transport::{Transport, UreqTransport};

/// The commands understood by the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StoreAsset,
    RemoveAsset,
    CheckAssetUrl,
    CheckAssetFilepath,
    StoreDoc,
    RetrieveDoc,
    RemoveDoc,
    CheckDocpath,
}

impl Command {
    pub fn path(self) -> &'static str {
        match self {
            Command::StoreAsset => "/asset/store",
            Command::RemoveAsset => "/asset/remove",
            Command::CheckAssetUrl => "/asset/check-url",
            Command::CheckAssetFilepath => "/asset/check-filepath",
            Command::StoreDoc => "/doc/store",
            Command::RetrieveDoc => "/doc/retrieve",
            Command::RemoveDoc => "/doc/remove",
            Command::CheckDocpath => "/doc/check-docpath",
        }
    }

    /// Texts filled in when the server's reply leaves them out.
    pub fn defaults(self) -> Defaults {
        match self {
            Command::StoreAsset => Defaults {
                title: "Success",
                msg: "Asset storing successful",
                failure_msg: "Asset storing failed",
            },
            Command::RemoveAsset => Defaults {
                title: "Success",
                msg: "Asset removed successfully",
                failure_msg: "Asset removal failed",
            },
            Command::StoreDoc => Defaults {
                title: "Success",
                msg: "Document storing successful",
                failure_msg: "Document storing failed",
            },
            Command::RemoveDoc => Defaults {
                title: "Document Removed",
                msg: "Document removal successful",
                failure_msg: "Document removal failed",
            },
            Command::CheckDocpath => Defaults {
                title: "Document Checked",
                msg: "Document check successful",
                failure_msg: "Document check failed",
            },
            Command::CheckAssetUrl | Command::CheckAssetFilepath => Defaults::GENERIC,
            // Retrieval replies are returned raw and never normalized.
            Command::RetrieveDoc => Defaults::GENERIC,
        }
    }

    /// Message used when the command fails before a reply arrives.
    pub fn failure_msg(self) -> &'static str {
        match self {
            Command::CheckAssetUrl => "Asset url check failed",
            Command::CheckAssetFilepath => "Asset filepath check failed",
            other => other.defaults().failure_msg,
        }
    }
}

/// Normalize a command reply. The HTTP status is ignored; the body decides.
pub fn parse_command(command: Command, response: &HttpResponse) -> CommandResult {
    let raw = RawResult::from_body(&response.body);
    normalize_with(raw.as_ref(), &command.defaults())
}

/// Client for the remote asset and document store.
#[derive(Debug, Clone)]
pub struct StorageClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl StorageClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }

    /// Build a client from `STORAGE_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }
}

impl<T: Transport> StorageClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Public URL of a stored asset. No request is made.
    ///
    /// Returns `None` when the base URL, client key or filepath is missing.
    pub fn asset_link(&self, filepath: &str) -> Option<String> {
        let base_url = self.config.base_url()?;
        let client_key = self.config.client_key()?;
        if filepath.is_empty() {
            return None;
        }
        let filepath = filepath.trim_start_matches('/');
        Some(format!("{base_url}/asset/{client_key}/{filepath}"))
    }

    /// Alias of [`StorageClient::asset_link`].
    pub fn alink(&self, filepath: &str) -> Option<String> {
        self.asset_link(filepath)
    }

    // ------------------------------------------------------------------
    // Request builders
    // ------------------------------------------------------------------

    pub fn build_store_asset(&self, filepath: &str, asset: FilePart) -> Result<HttpRequest> {
        self.build(Command::StoreAsset, &[("filepath", filepath)], Some(asset))
    }

    pub fn build_remove_asset(&self, filepath: &str) -> Result<HttpRequest> {
        self.build(Command::RemoveAsset, &[("filepath", filepath)], None)
    }

    pub fn build_check_asset_url(&self, url: &str) -> Result<HttpRequest> {
        let client_key = self.config.client_key().unwrap_or_default();
        self.build(
            Command::CheckAssetUrl,
            &[("clientKey", client_key), ("url", url)],
            None,
        )
    }

    pub fn build_check_asset_filepath(&self, filepath: &str) -> Result<HttpRequest> {
        let client_key = self.config.client_key().unwrap_or_default();
        self.build(
            Command::CheckAssetFilepath,
            &[("clientKey", client_key), ("filepath", filepath)],
            None,
        )
    }

    pub fn build_store_doc(&self, docpath: &str, doc: FilePart) -> Result<HttpRequest> {
        self.build(Command::StoreDoc, &[("docpath", docpath)], Some(doc))
    }

    pub fn build_retrieve_doc(&self, docpath: &str) -> Result<HttpRequest> {
        self.build(Command::RetrieveDoc, &[("docpath", docpath)], None)
    }

    pub fn build_remove_doc(&self, docpath: &str) -> Result<HttpRequest> {
        self.build(Command::RemoveDoc, &[("docpath", docpath)], None)
    }

    pub fn build_check_docpath(&self, docpath: &str) -> Result<HttpRequest> {
        self.build(Command::CheckDocpath, &[("docpath", docpath)], None)
    }

    /// Credentials first, in the order the service expects, then `extra`.
    fn build(
        &self,
        command: Command,
        extra: &[(&str, &str)],
        file: Option<FilePart>,
    ) -> Result<HttpRequest> {
        let base_url = self.config.base_url().ok_or(StorageError::MissingBaseUrl)?;
        let credentials = [
            ("clientName", self.config.client_name()),
            ("clientId", self.config.client_id()),
            ("clientSecret", self.config.client_secret()),
        ];
        let fields = credentials
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.unwrap_or_default().to_string()))
            .chain(
                extra
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string())),
            )
            .collect();

        Ok(HttpRequest {
            url: format!("{base_url}{}", command.path()),
            fields,
            file,
            timeout: self.config.timeout(),
        })
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    #[instrument(skip(self, content))]
    pub fn store_asset(&self, filepath: &str, content: impl AsRef<[u8]>) -> CommandResult {
        let response = self.upload(filepath, content.as_ref(), "asset", |file| {
            self.build_store_asset(filepath, file)
        });
        self.finish(Command::StoreAsset, response)
    }

    #[instrument(skip(self))]
    pub fn remove_asset(&self, filepath: &str) -> CommandResult {
        let response = self.send(self.build_remove_asset(filepath));
        self.finish(Command::RemoveAsset, response)
    }

    #[instrument(skip(self))]
    pub fn check_asset_url(&self, url: &str) -> CommandResult {
        let response = self.send(self.build_check_asset_url(url));
        self.finish(Command::CheckAssetUrl, response)
    }

    #[instrument(skip(self))]
    pub fn check_asset_filepath(&self, filepath: &str) -> CommandResult {
        let response = self.send(self.build_check_asset_filepath(filepath));
        self.finish(Command::CheckAssetFilepath, response)
    }

    #[instrument(skip(self, content))]
    pub fn store_doc(&self, docpath: &str, content: impl AsRef<[u8]>) -> CommandResult {
        let response = self.upload(docpath, content.as_ref(), "doc", |file| {
            self.build_store_doc(docpath, file)
        });
        self.finish(Command::StoreDoc, response)
    }

    /// Raw body of the stored document, whatever the status.
    ///
    /// Unlike the other commands the reply is not normalized, and local
    /// failures are returned as `Err`.
    #[instrument(skip(self))]
    pub fn retrieve_doc_bytes(&self, docpath: &str) -> Result<Vec<u8>> {
        let response = self.send(self.build_retrieve_doc(docpath))?;
        Ok(response.body)
    }

    /// [`StorageClient::retrieve_doc_bytes`] decoded as text. Invalid UTF-8
    /// is replaced rather than treated as a failure.
    pub fn retrieve_doc(&self, docpath: &str) -> Result<String> {
        let response = self.send(self.build_retrieve_doc(docpath))?;
        Ok(response.text().into_owned())
    }

    #[instrument(skip(self))]
    pub fn remove_doc(&self, docpath: &str) -> CommandResult {
        let response = self.send(self.build_remove_doc(docpath));
        self.finish(Command::RemoveDoc, response)
    }

    #[instrument(skip(self))]
    pub fn check_docpath(&self, docpath: &str) -> CommandResult {
        let response = self.send(self.build_check_docpath(docpath));
        self.finish(Command::CheckDocpath, response)
    }

    fn send(&self, request: Result<HttpRequest>) -> Result<HttpResponse> {
        let request = request?;
        debug!(url = %request.url, "executing storage command");
        self.transport.execute(&request)
    }

    /// Stage `content`, send the request built around it, then remove the
    /// staged file. The file is removed on every path out of this function.
    fn upload<F>(&self, target: &str, content: &[u8], field: &str, build: F) -> Result<HttpResponse>
    where
        F: FnOnce(FilePart) -> Result<HttpRequest>,
    {
        if self.config.base_url().is_none() {
            return Err(StorageError::MissingBaseUrl);
        }
        let staged = stage_upload(self.config.tmp_dir(), target, content)?;
        let response = self.send(build(staged.file_part(field)));
        if let Err(err) = staged.remove() {
            warn!(error = %err, "failed to remove staged upload");
        }
        response
    }

    fn finish(&self, command: Command, response: Result<HttpResponse>) -> CommandResult {
        match response {
            Ok(response) => {
                let result = parse_command(command, &response);
                debug!(
                    command = ?command,
                    status = response.status,
                    success = result.success,
                    code = result.code,
                    "storage command finished"
                );
                result
            }
            Err(err) => {
                warn!(command = ?command, error = %err, "storage command failed locally");
                CommandResult::from_failure(&err, command.failure_msg())
            }
        }
    }
}
