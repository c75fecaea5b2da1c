//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the single I/O seam of the crate. `UreqTransport` is the
//! production implementation; tests substitute their own to simulate
//! failures without a server.

use tracing::debug;
use ureq::tls::TlsConfig;
use ureq::Agent;
use uuid::Uuid;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};

/// Largest response body read into memory (1 GiB).
pub const MAX_BODY_BYTES: u64 = 1 << 30;

/// Performs one HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by `ureq`.
///
/// Certificate and host verification are disabled, and 4xx/5xx statuses are
/// returned as data: the JSON body, not the status line, decides the result.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(request: &HttpRequest) -> Agent {
        Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(request.timeout))
            .tls_config(TlsConfig::builder().disable_verification(true).build())
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let agent = Self::agent(request);

        let mut response = match &request.file {
            Some(_) => {
                let boundary = format!("----storage-{}", Uuid::new_v4().simple());
                let body = request.multipart_body(&boundary)?;
                debug!(url = %request.url, bytes = body.len(), "sending multipart request");
                agent
                    .post(&request.url)
                    .content_type(format!("multipart/form-data; boundary={boundary}"))
                    .send(&body[..])?
            }
            None => {
                debug!(url = %request.url, "sending form request");
                agent.post(&request.url).send_form(
                    request
                        .fields
                        .iter()
                        .map(|(name, value)| (name.as_str(), value.as_str())),
                )?
            }
        };

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()?;
        debug!(url = %request.url, status, bytes = body.len(), "received response");

        Ok(HttpResponse { status, body })
    }
}
