//! Error types shared by every service client.

use reqwest::header::HeaderMap;
use thiserror::Error;

/// Failure while moving bytes between the client and the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The caller cancelled the call scope.
    #[error("request cancelled")]
    Cancelled,

    /// The call scope's deadline passed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Network, DNS or TLS failure.
    #[error("{0}")]
    Network(String),
}

/// Status, headers and (JSON) body of a response that could not be turned
/// into a successful result.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers as received.
    pub headers: HeaderMap,
    /// Decoded body when the server sent JSON.
    pub body: Option<serde_json::Value>,
}

/// Errors returned by service operations and pagers.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input detected before any HTTP call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The service handle has no base URL.
    #[error("service URL is not set")]
    UrlMissing,

    /// Network failure, cancellation or deadline.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A 2xx response whose body could not be decoded into the target model.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Parser diagnostic.
        message: String,
        /// The response that failed to decode.
        response: Box<ErrorResponse>,
    },

    /// The server answered with a status >= 400.
    #[error("HTTP {}: {message}", response.status_code)]
    Http {
        /// Error message extracted from the body, or the canonical reason.
        message: String,
        /// The error response.
        response: Box<ErrorResponse>,
    },

    /// The pager was exhausted or a `next.href` could not be parsed.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// A token authenticator could not obtain a token.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Status returned by the token service, if it answered.
        status_code: Option<u16>,
        /// Failure description.
        message: String,
    },

    /// The request body could not be encoded.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if the request may succeed when sent again.
    ///
    /// Network failures, HTTP 429 and HTTP 5xx other than 501 are retryable.
    /// Cancellation and deadline expiry never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::Network(_)) => true,
            Self::Http { response, .. } => crate::retry::default_retryable_status(response.status_code),
            Self::Transport(_)
            | Self::Validation(_)
            | Self::UrlMissing
            | Self::Decode { .. }
            | Self::Pagination(_)
            | Self::Authentication { .. }
            | Self::Serialization(_) => false,
        }
    }

    /// Returns `true` if the call scope was cancelled or ran past its deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Cancelled | TransportError::DeadlineExceeded)
        )
    }

    /// The response received from the server, when there was one.
    pub fn response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Decode { response, .. } | Self::Http { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status of the received response, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status_code, .. } => *status_code,
            _ => self.response().map(|r| r.status_code),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(TransportError::Network(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> Error {
        Error::Http {
            message: "boom".into(),
            response: Box::new(ErrorResponse {
                status_code: status,
                headers: HeaderMap::new(),
                body: None,
            }),
        }
    }

    #[test]
    fn network_error_is_retryable() {
        let err = Error::Transport(TransportError::Network("connection reset".into()));
        assert!(err.is_retryable());
        assert!(!err.is_cancellation());
    }

    #[test]
    fn cancellation_is_never_retryable() {
        let cancelled = Error::Transport(TransportError::Cancelled);
        assert!(!cancelled.is_retryable());
        assert!(cancelled.is_cancellation());

        let deadline = Error::Transport(TransportError::DeadlineExceeded);
        assert!(!deadline.is_retryable());
        assert!(deadline.is_cancellation());
    }

    #[test]
    fn http_retryability_follows_status() {
        assert!(http(429).is_retryable());
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(501).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(404).is_retryable());
    }

    #[test]
    fn preflight_errors_carry_no_response() {
        assert!(Error::validation("missing").response().is_none());
        assert!(Error::UrlMissing.response().is_none());
        assert_eq!(Error::UrlMissing.status_code(), None);
    }

    #[test]
    fn http_error_exposes_status() {
        let err = http(404);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404: boom");
    }
}
