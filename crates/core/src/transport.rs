//! The HTTP transport seam.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Error;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one HTTP request and returns the raw response.
///
/// The service handle owns retry, authentication and decoding; a transport
/// only moves bytes. The default is [`ReqwestTransport`]; tests and callers
/// with special networking needs can inject their own.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

/// A [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// A transport with the default timeout and TLS verification on.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Wrap an existing client, for example to share a connection pool.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Configure timeout and TLS verification.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.client.execute(request).await
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    disable_ssl_verification: bool,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            disable_ssl_verification: false,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Set the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accept any server certificate.
    #[must_use]
    pub fn disable_ssl_verification(mut self, disable: bool) -> Self {
        self.disable_ssl_verification = disable;
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, Error> {
        let client = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.disable_ssl_verification)
            .build()
            .map_err(|e| Error::validation(format!("failed to build HTTP client: {e}")))?;
        Ok(ReqwestTransport { client })
    }
}
