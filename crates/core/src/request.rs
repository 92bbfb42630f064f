//! Request construction.
//!
//! A [`RequestBuilder`] accumulates method, URL, query, headers and body and
//! produces an immutable [`Request`]. The request is converted to a
//! `reqwest::Request` once per attempt so retries resend identical bytes.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::context::CallContext;
use crate::error::Error;
use crate::headers::{Headers, X_CORRELATION_ID};
use crate::url::resolve_request_url;

/// `application/json`
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `application/json-patch+json`
pub const CONTENT_TYPE_JSON_PATCH: &str = "application/json-patch+json";
/// `application/csv`
pub const CONTENT_TYPE_CSV: &str = "application/csv";

/// HTTP methods used by the service clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    /// Returns the method name as an uppercase string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// A fully built request, ready for the transport.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: Headers,
    /// Encoded (and possibly compressed) body.
    pub body: Option<Bytes>,
    /// Cancellation scope for the call.
    pub context: CallContext,
}

impl Request {
    /// The absolute URL including the encoded query string.
    pub fn full_url(&self) -> Result<reqwest::Url, Error> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| Error::validation(format!("invalid request URL '{}': {e}", self.url)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Convert into a `reqwest::Request` for one attempt.
    pub fn to_reqwest(&self) -> Result<reqwest::Request, Error> {
        let mut request = reqwest::Request::new(self.method.into(), self.full_url()?);
        *request.headers_mut() = header_map(&self.headers)?;
        if let Some(body) = &self.body {
            *request.body_mut() = Some(body.clone().into());
        }
        Ok(request)
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap, Error> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::validation(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::validation(format!("invalid value for header '{name}': {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

/// Accumulates the parts of a request.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use scc_core::{Method, RequestBuilder};
///
/// let mut builder = RequestBuilder::new(Method::Get);
/// builder
///     .resolve_request_url(
///         "https://example.com",
///         "/instances/{instance_id}/v3/reports",
///         &HashMap::from([("instance_id", "abc")]),
///     )
///     .unwrap();
/// builder.add_query("limit", 50);
///
/// let request = builder.build().unwrap();
/// assert_eq!(
///     request.full_url().unwrap().as_str(),
///     "https://example.com/instances/abc/v3/reports?limit=50"
/// );
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Option<String>,
    query: Vec<(String, String)>,
    headers: Headers,
    body: Option<Bytes>,
    gzip: bool,
    context: CallContext,
}

impl RequestBuilder {
    /// Start a request with the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            url: None,
            query: Vec::new(),
            headers: Headers::new(),
            body: None,
            gzip: false,
            context: CallContext::background(),
        }
    }

    /// Attach the call's cancellation scope.
    pub fn with_context(&mut self, context: &CallContext) -> &mut Self {
        self.context = context.clone();
        self
    }

    /// Compress the body with gzip when one is present.
    pub fn enable_gzip_compression(&mut self, enabled: bool) -> &mut Self {
        self.gzip = enabled;
        self
    }

    /// Set the URL from a base URL, a path template and its parameters.
    pub fn resolve_request_url(
        &mut self,
        base_url: &str,
        path: &str,
        params: &HashMap<&str, &str>,
    ) -> Result<&mut Self, Error> {
        self.url = Some(resolve_request_url(base_url, path, params)?);
        Ok(self)
    }

    /// Add a query parameter. Repeated names are kept.
    pub fn add_query(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn add_optional_query<V: fmt::Display>(
        &mut self,
        name: &str,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.add_query(name, value);
        }
        self
    }

    /// Append a header value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    /// Overlay a set of headers, replacing values for names already present.
    pub fn add_headers(&mut self, headers: &Headers) -> &mut Self {
        self.headers.extend_replacing(headers);
        self
    }

    /// Set `X-Correlation-Id` when given, then overlay the caller's headers.
    pub fn add_call_headers(&mut self, correlation_id: Option<&str>, headers: &Headers) -> &mut Self {
        if let Some(id) = correlation_id {
            self.headers.set(X_CORRELATION_ID, id);
        }
        self.add_headers(headers)
    }

    /// Serialize `body` as JSON and use `content_type`.
    ///
    /// Already-encoded bytes go through [`RequestBuilder::set_body_bytes`].
    pub fn set_json_body<T>(&mut self, body: &T, content_type: &str) -> Result<&mut Self, Error>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_vec(body).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers.set("Content-Type", content_type);
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    /// Use `bytes` verbatim with the given content type.
    pub fn set_body_bytes(&mut self, bytes: impl Into<Bytes>, content_type: &str) -> &mut Self {
        self.headers.set("Content-Type", content_type);
        self.body = Some(bytes.into());
        self
    }

    /// Produce the immutable request.
    pub fn build(self) -> Result<Request, Error> {
        let url = self.url.ok_or(Error::UrlMissing)?;
        let mut headers = self.headers;
        if !headers.contains("Accept") {
            headers.set("Accept", CONTENT_TYPE_JSON);
        }

        let body = match self.body {
            Some(body) if self.gzip => {
                headers.set("Content-Encoding", "gzip");
                Some(gzip(&body)?)
            }
            other => other,
        };

        Ok(Request {
            method: self.method,
            url,
            query: self.query,
            headers,
            body,
            context: self.context,
        })
    }
}

fn gzip(data: &[u8]) -> Result<Bytes, Error> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .map(Bytes::from)
        .map_err(|e| Error::Serialization(format!("gzip compression failed: {e}")))
}
