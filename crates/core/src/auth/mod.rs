//! Authenticators applied to every outgoing request.
//!
//! An [`Authenticator`] mutates a built [`Request`] before each attempt,
//! normally by setting `Authorization`. Static credentials (basic, bearer)
//! live here; token-exchanging authenticators are in [`token`].

pub mod token;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Error;
use crate::request::Request;

pub use token::{
    CloudPakForDataAuthenticator, ContainerAuthenticator, IamAssumeAuthenticator,
    IamAuthenticator,
};

/// The recognised authenticator variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    NoAuth,
    Basic,
    BearerToken,
    Iam,
    Container,
    Cp4d,
    IamAssume,
}

impl AuthType {
    /// Canonical lowercase name, as accepted in `*_AUTH_TYPE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoAuth => "noauth",
            Self::Basic => "basic",
            Self::BearerToken => "bearertoken",
            Self::Iam => "iam",
            Self::Container => "container",
            Self::Cp4d => "cp4d",
            Self::IamAssume => "iamassume",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noauth" => Ok(Self::NoAuth),
            "basic" => Ok(Self::Basic),
            "bearertoken" => Ok(Self::BearerToken),
            "iam" => Ok(Self::Iam),
            "container" => Ok(Self::Container),
            "cp4d" => Ok(Self::Cp4d),
            "iamassume" => Ok(Self::IamAssume),
            other => Err(Error::validation(format!(
                "unrecognized authentication type: '{other}'"
            ))),
        }
    }
}

/// Applies credentials to outgoing requests.
///
/// `authenticate` may suspend (token authenticators fetch and cache tokens);
/// the caller runs it under the call's cancellation scope.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Which variant this is.
    fn auth_type(&self) -> AuthType;

    /// Check the configuration without touching the network.
    fn validate(&self) -> Result<(), Error>;

    /// Add credentials to `request`.
    async fn authenticate(&self, request: &mut Request) -> Result<(), Error>;
}

/// Sends requests without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthAuthenticator;

#[async_trait]
impl Authenticator for NoAuthAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::NoAuth
    }

    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn authenticate(&self, _request: &mut Request) -> Result<(), Error> {
        Ok(())
    }
}

/// HTTP Basic authentication (`Authorization: Basic <base64>`).
#[derive(Clone)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    /// Create and validate a basic authenticator.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, Error> {
        let auth = Self {
            username: username.into(),
            password: password.into(),
        };
        auth.validate()?;
        Ok(auth)
    }

    /// The configured username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::Basic
    }

    fn validate(&self) -> Result<(), Error> {
        require_credential("username", &self.username)?;
        require_credential("password", &self.password)
    }

    async fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        request.headers.set("Authorization", format!("Basic {encoded}"));
        Ok(())
    }
}

/// A caller-supplied bearer token (`Authorization: Bearer <token>`).
#[derive(Clone)]
pub struct BearerTokenAuthenticator {
    token: String,
}

impl BearerTokenAuthenticator {
    /// Create and validate a bearer-token authenticator.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let auth = Self {
            token: token.into(),
        };
        auth.validate()?;
        Ok(auth)
    }

    /// Swap in a fresh token obtained elsewhere.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }
}

impl fmt::Debug for BearerTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerTokenAuthenticator")
            .field(&"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::BearerToken
    }

    fn validate(&self) -> Result<(), Error> {
        if self.token.is_empty() {
            return Err(Error::validation("the bearer token cannot be empty"));
        }
        Ok(())
    }

    async fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        request
            .headers
            .set("Authorization", format!("Bearer {}", self.token));
        Ok(())
    }
}

/// Reject empty credentials and values that look like copy-paste accidents
/// (wrapped in braces or quotes).
pub(crate) fn require_credential(name: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::validation(format!("the {name} property is required")));
    }
    let looks_templated = value.starts_with('{')
        || value.ends_with('}')
        || value.starts_with('"')
        || value.ends_with('"');
    if looks_templated {
        return Err(Error::validation(format!(
            "the {name} property must not start or end with curly brackets or quotes; \
             remove any surrounding {{, }} or \" characters"
        )));
    }
    Ok(())
}
