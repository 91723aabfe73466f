//! Rate-limited document submission client.
//!
//! [`DocumentClient`] takes one permit from its [`AdmissionGate`] per submission, then
//! hands the request to a [`Transport`]. Neither the gate nor the client retries: an
//! admission timeout or transport failure is returned to the caller as-is.

use crate::document::Document;
use crate::{AcquireTimeout, AdmissionGate};
use std::fmt;

/// Host used by [`DocumentClient`] unless overridden.
pub const DEFAULT_BASE_URL: &str = "https://ismp.crpt.ru";

const CREATE_DOCUMENT_PATH: &str = "/api/v3/lk/documents/create";

/// A fully-built submission, handed to the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub url: String,
    pub bearer_token: String,
    pub body: String,
}

impl fmt::Debug for SubmitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitRequest")
            .field("url", &self.url)
            .field("bearer_token", &"<redacted>")
            .field("body", &self.body)
            .finish()
    }
}

/// The transport could not complete the exchange.
#[derive(Debug, thiserror::Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Sends a JSON POST and returns the response body.
///
/// Implementations are called synchronously, after the permit has been granted.
pub trait Transport: Send + Sync {
    fn post(&self, request: &SubmitRequest) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn post(&self, request: &SubmitRequest) -> Result<String, TransportError> {
        (**self).post(request)
    }
}

/// Blocking HTTP transport backed by reqwest.
///
/// Must not be used from inside an async runtime worker.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self { client: reqwest::blocking::Client::builder().build()? })
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn post(&self, request: &SubmitRequest) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&request.bearer_token)
            .body(request.body.clone())
            .send()?;
        tracing::debug!(status = response.status().as_u16(), url = %request.url, "document submitted");
        Ok(response.text()?)
    }
}

/// Errors returned by [`DocumentClient::create_document`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// No permit was granted within the gate's acquire timeout.
    #[error(transparent)]
    Admission(#[from] AcquireTimeout),
    /// The document could not be encoded.
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    /// The request could not be delivered.
    #[error("failed to create document: {0}")]
    Transport(#[from] TransportError),
}

impl SubmitError {
    /// Check if the submission was refused by the admission gate.
    pub fn is_admission_timeout(&self) -> bool {
        matches!(self, Self::Admission(_))
    }
}

/// Client that submits documents through a shared admission gate.
///
/// Share one client (or clones of its gate) across threads to rate-limit all of them together.
pub struct DocumentClient<T> {
    token: String,
    gate: AdmissionGate,
    transport: T,
    base_url: String,
}

#[cfg(feature = "http")]
impl DocumentClient<HttpTransport> {
    /// Client allowing 10 submissions per second, waiting up to 5 seconds for a permit.
    pub fn new(token: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_config(token, crate::GateConfig::default())
    }

    /// Client with a custom gate configuration.
    pub fn with_config(
        token: impl Into<String>,
        config: crate::GateConfig,
    ) -> Result<Self, TransportError> {
        Ok(Self::with_transport(token, AdmissionGate::new(config), HttpTransport::new()?))
    }
}

impl<T: Transport> DocumentClient<T> {
    /// Client with an explicit gate and transport.
    pub fn with_transport(token: impl Into<String>, gate: AdmissionGate, transport: T) -> Self {
        Self { token: token.into(), gate, transport, base_url: DEFAULT_BASE_URL.to_string() }
    }

    /// Override the host requests are sent to.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Gate submissions are admitted through.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Submit `document` signed with `signature`, returning the response body.
    ///
    /// Blocks until the gate grants a permit.
    ///
    /// # Errors
    /// [`SubmitError::Admission`] if the gate times out (nothing is sent), otherwise
    /// encoding or transport failures.
    pub fn create_document(&self, document: &Document, signature: &str) -> Result<String, SubmitError> {
        let permit = self.gate.acquire()?;

        let request = SubmitRequest {
            url: self.create_url(document),
            bearer_token: self.token.clone(),
            body: serde_json::to_string(&document.payload(signature))?,
        };
        tracing::debug!(
            product_group = document.product_group().name(),
            waited_ms = permit.waited().as_millis() as u64,
            "submitting document"
        );
        Ok(self.transport.post(&request)?)
    }

    fn create_url(&self, document: &Document) -> String {
        format!(
            "{}{}?pg={}",
            self.base_url.trim_end_matches('/'),
            CREATE_DOCUMENT_PATH,
            document.product_group().name()
        )
    }
}

impl<T> fmt::Debug for DocumentClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClient")
            .field("base_url", &self.base_url)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
