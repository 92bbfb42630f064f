//! Request pipeline shared by the Security and Compliance Center clients.
//!
//! The pieces, leaves first:
//!
//! - [`url`]: service URL templates and path-parameter substitution.
//! - [`request`]: the request builder and the built request.
//! - [`auth`]: authenticators applied before each attempt.
//! - [`retry`] and [`transport`]: back-off policy and the HTTP seam.
//! - [`service`]: the handle that sends, retries and decodes.
//! - [`decode`]: field helpers for response models.
//! - [`pagination`]: cursor-threading pagers over list operations.
//! - [`config`]: properties from credentials files and the environment.

#[macro_use]
mod macros;

pub mod auth;
pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod headers;
pub mod pagination;
pub mod request;
pub mod response;
pub mod retry;
pub mod service;
pub mod transport;
pub mod url;

pub use auth::{
    AuthType, Authenticator, BasicAuthenticator, BearerTokenAuthenticator,
    CloudPakForDataAuthenticator, ContainerAuthenticator, IamAssumeAuthenticator,
    IamAuthenticator, NoAuthAuthenticator,
};
pub use config::{ServiceProperties, authenticator_from_environment, authenticator_from_properties};
pub use context::CallContext;
pub use error::{Error, ErrorResponse, TransportError};
pub use headers::{Headers, X_CORRELATION_ID, sdk_headers, user_agent};
pub use pagination::{Page, PageFetcher, PagedResult, Pager};
pub use request::{
    CONTENT_TYPE_CSV, CONTENT_TYPE_JSON, CONTENT_TYPE_JSON_PATCH, Method, Request, RequestBuilder,
};
pub use response::{ByteStream, DetailedResponse};
pub use retry::RetryPolicy;
pub use service::BaseService;
pub use transport::{ReqwestTransport, Transport};
pub use url::{construct_service_url, resolve_request_url};
