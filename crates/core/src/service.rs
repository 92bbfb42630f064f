//! The service handle shared by every generated client.
//!
//! A [`BaseService`] owns the base URL, authenticator, retry policy, gzip
//! flag, default headers and transport. Service crates wrap one and build
//! their operations on [`BaseService::request_builder`],
//! [`BaseService::execute`] and [`BaseService::execute_stream`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::auth::Authenticator;
use crate::config::{
    PROP_DISABLE_SSL, PROP_ENABLE_GZIP, PROP_ENABLE_RETRIES, PROP_MAX_RETRIES,
    PROP_RETRY_INTERVAL, PROP_URL, ServiceProperties,
};
use crate::context::CallContext;
use crate::error::{Error, ErrorResponse};
use crate::headers::Headers;
use crate::request::{Method, Request, RequestBuilder};
use crate::response::{ByteStream, DetailedResponse};
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport};

/// Non-JSON error bodies up to this size are kept as a string.
const MAX_RAW_ERROR_BODY: usize = 4096;

/// Base URL, credentials and transport policy for one service.
///
/// Cloning is cheap: the clone shares the authenticator (and its token
/// cache) and the connection pool, but later configuration changes on one
/// handle do not affect the other.
#[derive(Debug, Clone)]
pub struct BaseService {
    service_url: String,
    authenticator: Arc<dyn Authenticator>,
    retry: RetryPolicy,
    gzip: bool,
    default_headers: Headers,
    transport: Arc<dyn Transport>,
}

impl BaseService {
    /// Create a handle with retries and gzip disabled.
    ///
    /// The authenticator is validated here. An empty `service_url` is
    /// accepted, but every call then fails with [`Error::UrlMissing`].
    pub fn new(
        service_url: impl Into<String>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self, Error> {
        authenticator.validate()?;
        let mut service = Self {
            service_url: String::new(),
            authenticator,
            retry: RetryPolicy::default(),
            gzip: false,
            default_headers: Headers::new(),
            transport: Arc::new(ReqwestTransport::new()?),
        };
        service.set_service_url(service_url)?;
        Ok(service)
    }

    /// Apply `URL`, `DISABLE_SSL`, retry and gzip properties.
    pub fn configure(&mut self, props: &ServiceProperties) -> Result<(), Error> {
        if let Some(url) = props.get(PROP_URL) {
            self.set_service_url(url)?;
        }
        if props.get_bool(PROP_DISABLE_SSL) == Some(true) {
            self.disable_ssl_verification()?;
        }
        if props.get_bool(PROP_ENABLE_RETRIES) == Some(true) {
            let max_retries = props.get_u32(PROP_MAX_RETRIES)?.unwrap_or(0);
            let interval = props
                .get_duration_secs(PROP_RETRY_INTERVAL)?
                .unwrap_or(Duration::ZERO);
            self.enable_retries(max_retries, interval);
        }
        if let Some(gzip) = props.get_bool(PROP_ENABLE_GZIP) {
            self.set_enable_gzip_compression(gzip);
        }
        debug!(url = %self.service_url, retries = self.retry.enabled, gzip = self.gzip, "service configured");
        Ok(())
    }

    /// Replace the base URL. A trailing `/` is dropped.
    pub fn set_service_url(&mut self, url: impl Into<String>) -> Result<(), Error> {
        let url = url.into();
        let url = url.trim_end_matches('/');
        if !url.is_empty() {
            reqwest::Url::parse(url)
                .map_err(|e| Error::validation(format!("invalid service URL '{url}': {e}")))?;
        }
        self.service_url = url.to_owned();
        Ok(())
    }

    /// The base URL.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// The authenticator applied to every request.
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Headers sent with every request. Per-call headers override them.
    pub fn set_default_headers(&mut self, headers: Headers) {
        self.default_headers = headers;
    }

    /// The headers sent with every request.
    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// Retry transient failures. Zero values select the defaults.
    pub fn enable_retries(&mut self, max_retries: u32, max_interval: Duration) {
        self.retry = RetryPolicy::enabled(max_retries, max_interval);
    }

    /// Send every request exactly once.
    pub fn disable_retries(&mut self) {
        self.retry.enabled = false;
    }

    /// Install a fully custom retry policy.
    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry = policy;
    }

    /// The active retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Compress request bodies with gzip.
    pub fn set_enable_gzip_compression(&mut self, enabled: bool) {
        self.gzip = enabled;
    }

    /// Whether request bodies are compressed.
    pub fn enable_gzip_compression(&self) -> bool {
        self.gzip
    }

    /// Replace the transport with one that accepts any server certificate.
    ///
    /// A transport installed with [`BaseService::set_transport`] is
    /// discarded.
    pub fn disable_ssl_verification(&mut self) -> Result<(), Error> {
        let transport = ReqwestTransport::builder()
            .disable_ssl_verification(true)
            .build()?;
        self.transport = Arc::new(transport);
        Ok(())
    }

    /// Use a different transport.
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = transport;
    }

    /// Start a request against this service.
    ///
    /// Resolves `path` against the base URL, attaches `ctx`, applies the gzip
    /// flag and the default headers.
    pub fn request_builder(
        &self,
        method: Method,
        path: &str,
        path_params: &HashMap<&str, &str>,
        ctx: &CallContext,
    ) -> Result<RequestBuilder, Error> {
        let mut builder = RequestBuilder::new(method);
        builder
            .with_context(ctx)
            .enable_gzip_compression(self.gzip)
            .resolve_request_url(&self.service_url, path, path_params)?
            .add_headers(&self.default_headers);
        Ok(builder)
    }

    /// Send `request` and decode a JSON body into `T`.
    ///
    /// An empty 2xx body yields `result: None`.
    #[instrument(name = "scc.execute", skip_all, fields(operation = operation, method = %request.method, url = %request.url))]
    pub async fn execute<T>(
        &self,
        operation: &str,
        request: Request,
    ) -> Result<DetailedResponse<T>, Error>
    where
        T: DeserializeOwned,
    {
        let response = self.send(&request).await?;
        let status_code = response.status().as_u16();
        let headers = response.headers().clone();
        let body = request.context.run(response.bytes()).await??;

        if body.iter().all(u8::is_ascii_whitespace) {
            debug!(status = status_code, "empty response body");
            return Ok(DetailedResponse {
                status_code,
                headers,
                result: None,
            });
        }

        match serde_json::from_slice::<T>(&body) {
            Ok(result) => Ok(DetailedResponse {
                status_code,
                headers,
                result: Some(result),
            }),
            Err(e) => {
                warn!(status = status_code, error = %e, "response body did not decode");
                Err(Error::Decode {
                    message: e.to_string(),
                    response: Box::new(ErrorResponse {
                        status_code,
                        headers,
                        body: raw_body(&body),
                    }),
                })
            }
        }
    }

    /// Send `request` and hand back the body unread.
    ///
    /// A response that declares an empty body yields `result: None`.
    #[instrument(name = "scc.execute_stream", skip_all, fields(operation = operation, method = %request.method, url = %request.url))]
    pub async fn execute_stream(
        &self,
        operation: &str,
        request: Request,
    ) -> Result<DetailedResponse<ByteStream>, Error> {
        let response = self.send(&request).await?;
        let status_code = response.status().as_u16();
        let headers = response.headers().clone();
        if response.content_length() == Some(0) {
            debug!(status = status_code, "empty response body");
            return Ok(DetailedResponse {
                status_code,
                headers,
                result: None,
            });
        }
        Ok(DetailedResponse {
            status_code,
            headers,
            result: Some(ByteStream::from_response(response)),
        })
    }

    /// Authenticate and send with retries until a response below 400
    /// arrives or the policy gives up.
    async fn send(&self, request: &Request) -> Result<reqwest::Response, Error> {
        let ctx = &request.context;
        let max_attempts = self.retry.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            ctx.check()?;
            attempt += 1;

            let mut outgoing = request.clone();
            ctx.run(self.authenticator.authenticate(&mut outgoing))
                .await??;
            let http_request = outgoing.to_reqwest()?;

            debug!(attempt, "sending request");
            let can_retry = attempt < max_attempts;
            match ctx.run(self.transport.send(http_request)).await? {
                Ok(response) => {
                    let status = response.status().as_u16();
                    debug!(attempt, status, "received response");
                    if status < 400 {
                        return Ok(response);
                    }
                    let headers = response.headers().clone();
                    if can_retry && self.retry.should_retry_status(status) {
                        let delay = self.retry.backoff(attempt - 1, Some(&headers));
                        warn!(attempt, status, delay_ms = delay.as_millis(), "retrying request");
                        ctx.sleep(delay).await?;
                        continue;
                    }
                    let body = ctx.run(response.bytes()).await?.unwrap_or_default();
                    return Err(http_error(status, headers, &body));
                }
                Err(e) => {
                    let error = Error::from(e);
                    if can_retry && self.retry.enabled && error.is_retryable() {
                        let delay = self.retry.backoff(attempt - 1, None);
                        warn!(attempt, error = %error, delay_ms = delay.as_millis(), "retrying request");
                        ctx.sleep(delay).await?;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }
}

/// Build an [`Error::Http`] from a failed response.
fn http_error(status_code: u16, headers: HeaderMap, body: &Bytes) -> Error {
    let body = raw_body(body);
    let message = body
        .as_ref()
        .and_then(error_message)
        .or_else(|| {
            StatusCode::from_u16(status_code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "unknown error".to_owned());
    Error::Http {
        message,
        response: Box::new(ErrorResponse {
            status_code,
            headers,
            body,
        }),
    }
}

/// JSON bodies are kept as parsed; small UTF-8 bodies as a string.
fn raw_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        return Some(json);
    }
    if body.len() <= MAX_RAW_ERROR_BODY {
        return std::str::from_utf8(body)
            .ok()
            .map(|s| Value::String(s.to_owned()));
    }
    None
}

/// Pull a human-readable message out of the usual error body shapes.
fn error_message(body: &Value) -> Option<String> {
    let text = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_owned);
    body.pointer("/errors/0/message")
        .and_then(text)
        .or_else(|| body.get("error").and_then(text))
        .or_else(|| body.get("message").and_then(text))
        .or_else(|| body.get("errorMessage").and_then(text))
}
