//! Authenticators that exchange a credential for a short-lived access token.
//!
//! Each one keeps its token in a [`TokenCache`] and refreshes it on the first
//! request after 80% of its lifetime has elapsed. Refresh is serialized, so
//! concurrent requests wait for a single exchange.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{AuthType, Authenticator, require_credential};
use crate::error::Error;
use crate::request::Request;

/// Default IAM endpoint.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

/// Default location of the compute-resource token inside a container.
pub const DEFAULT_CR_TOKEN_FILENAME: &str = "/var/run/secrets/tokens/vault-token";

const IAM_TOKEN_PATH: &str = "/identity/token";
const CP4D_TOKEN_PATH: &str = "/v1/authorize";

const GRANT_TYPE_APIKEY: &str = "urn:ibm:params:oauth:grant-type:apikey";
const GRANT_TYPE_CR_TOKEN: &str = "urn:ibm:params:oauth:grant-type:cr-token";
const GRANT_TYPE_ASSUME: &str = "urn:ibm:params:oauth:grant-type:assume";

/// Lifetime assumed when the token service does not say.
const FALLBACK_LIFETIME_SECS: i64 = 3600;

/// A token as returned by a token service.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer value.
    pub value: String,
    /// Unix time the token expires.
    pub expires_at: i64,
}

#[derive(Debug)]
struct CachedToken {
    token: AccessToken,
    refresh_at: i64,
}

/// Holds one access token and decides when to refresh it.
#[derive(Default)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}

impl TokenCache {
    /// Return the cached token, calling `fetch` when there is none or it is
    /// due for refresh.
    ///
    /// If a refresh fails while the old token is still unexpired, the old
    /// token is used.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<String, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, Error>>,
    {
        let mut slot = self.slot.lock().await;
        let now = Utc::now().timestamp();
        if let Some(cached) = slot.as_ref() {
            if now < cached.refresh_at {
                return Ok(cached.token.value.clone());
            }
        }

        match fetch().await {
            Ok(token) => {
                debug!(expires_at = token.expires_at, "acquired access token");
                let lifetime = (token.expires_at - now).max(0);
                let refresh_at = now + lifetime * 4 / 5;
                let value = token.value.clone();
                *slot = Some(CachedToken { token, refresh_at });
                Ok(value)
            }
            Err(err) => match slot.as_ref() {
                Some(cached) if now < cached.token.expires_at => {
                    warn!(error = %err, "token refresh failed, using unexpired token");
                    Ok(cached.token.value.clone())
                }
                _ => Err(err),
            },
        }
    }

    /// Drop the cached token.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expiration: Option<i64>,
}

impl IamTokenResponse {
    fn into_access_token(self) -> AccessToken {
        let now = Utc::now().timestamp();
        let expires_at = self
            .expiration
            .or_else(|| self.expires_in.map(|secs| now + secs))
            .or_else(|| jwt_expiry(&self.access_token))
            .unwrap_or(now + FALLBACK_LIFETIME_SECS);
        AccessToken {
            value: self.access_token,
            expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Cp4dTokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying it.
fn jwt_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<JwtClaims>(&decoded).ok()?.exp
}

fn token_client() -> Result<Client, Error> {
    Client::builder()
        .build()
        .map_err(|e| Error::validation(format!("failed to build token client: {e}")))
}

fn iam_token_url(base: &str) -> String {
    let base = base.trim_end_matches('/').trim_end_matches(IAM_TOKEN_PATH);
    format!("{base}{IAM_TOKEN_PATH}")
}

async fn send_token_request<T>(request: reqwest::RequestBuilder) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let response = request.send().await.map_err(|e| Error::Authentication {
        status_code: None,
        message: e.to_string(),
    })?;
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(256).collect();
        return Err(Error::Authentication {
            status_code: Some(status),
            message: format!("token request returned {status}: {snippet}"),
        });
    }
    response.json::<T>().await.map_err(|e| Error::Authentication {
        status_code: Some(status),
        message: format!("invalid token response: {e}"),
    })
}

/// Optional OAuth client credentials and scope sent with IAM requests.
#[derive(Clone, Default)]
struct IamClientOptions {
    client_id: Option<String>,
    client_secret: Option<String>,
    scope: Option<String>,
}

impl IamClientOptions {
    fn validate(&self) -> Result<(), Error> {
        match (&self.client_id, &self.client_secret) {
            (Some(_), None) | (None, Some(_)) => Err(Error::validation(
                "client_id and client_secret must be provided together",
            )),
            _ => Ok(()),
        }
    }

    fn apply(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) {
            request = request.basic_auth(id, Some(secret));
        }
        request
    }

    fn push_scope<'a>(&'a self, form: &mut Vec<(&'static str, &'a str)>) {
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }
    }
}

async fn iam_form_exchange(
    http: &Client,
    url: &str,
    options: &IamClientOptions,
    form: &[(&str, &str)],
) -> Result<AccessToken, Error> {
    let request = http
        .post(iam_token_url(url))
        .header("Accept", "application/json")
        .form(form);
    let response: IamTokenResponse = send_token_request(options.apply(request)).await?;
    Ok(response.into_access_token())
}

// =========================================================================
// IAM (API key)
// =========================================================================

/// Exchanges an API key for an IAM access token.
pub struct IamAuthenticator {
    apikey: String,
    url: String,
    options: IamClientOptions,
    http: Client,
    cache: TokenCache,
}

impl IamAuthenticator {
    /// Create an authenticator for `apikey` against the default IAM URL.
    pub fn new(apikey: impl Into<String>) -> Result<Self, Error> {
        let auth = Self {
            apikey: apikey.into(),
            url: DEFAULT_IAM_URL.to_owned(),
            options: IamClientOptions::default(),
            http: token_client()?,
            cache: TokenCache::default(),
        };
        auth.validate()?;
        Ok(auth)
    }

    /// Use a different IAM endpoint. Empty keeps the default.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.url = url;
        }
        self
    }

    /// Send OAuth client credentials with each token request.
    #[must_use]
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.options.client_id = Some(client_id.into());
        self.options.client_secret = Some(client_secret.into());
        self
    }

    /// Request a specific scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.options.scope = Some(scope.into());
        self
    }

    /// Use a specific HTTP client for token requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// The IAM endpoint in use.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch a fresh token, bypassing the cache.
    pub async fn request_token(&self) -> Result<AccessToken, Error> {
        let mut form = vec![
            ("grant_type", GRANT_TYPE_APIKEY),
            ("apikey", self.apikey.as_str()),
            ("response_type", "cloud_iam"),
        ];
        self.options.push_scope(&mut form);
        iam_form_exchange(&self.http, &self.url, &self.options, &form).await
    }
}

impl fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("apikey", &"[REDACTED]")
            .field("url", &self.url)
            .field("client_id", &self.options.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::Iam
    }

    fn validate(&self) -> Result<(), Error> {
        require_credential("apikey", &self.apikey)?;
        self.options.validate()
    }

    async fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        let token = self.cache.get_or_refresh(|| self.request_token()).await?;
        request.headers.set("Authorization", format!("Bearer {token}"));
        Ok(())
    }
}

// =========================================================================
// Container (compute-resource token)
// =========================================================================

/// Exchanges the compute-resource token mounted in a container for an IAM
/// access token bound to a trusted profile.
pub struct ContainerAuthenticator {
    cr_token_filename: String,
    iam_profile_name: Option<String>,
    iam_profile_id: Option<String>,
    url: String,
    options: IamClientOptions,
    http: Client,
    cache: TokenCache,
}

impl ContainerAuthenticator {
    /// Create an authenticator reading the default token file.
    ///
    /// A profile name or id must be set before use.
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            cr_token_filename: DEFAULT_CR_TOKEN_FILENAME.to_owned(),
            iam_profile_name: None,
            iam_profile_id: None,
            url: DEFAULT_IAM_URL.to_owned(),
            options: IamClientOptions::default(),
            http: token_client()?,
            cache: TokenCache::default(),
        })
    }

    /// Read the compute-resource token from a different file.
    #[must_use]
    pub fn with_cr_token_filename(mut self, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        if !filename.is_empty() {
            self.cr_token_filename = filename;
        }
        self
    }

    /// Trusted profile name.
    #[must_use]
    pub fn with_iam_profile_name(mut self, name: impl Into<String>) -> Self {
        self.iam_profile_name = Some(name.into());
        self
    }

    /// Trusted profile id.
    #[must_use]
    pub fn with_iam_profile_id(mut self, id: impl Into<String>) -> Self {
        self.iam_profile_id = Some(id.into());
        self
    }

    /// Use a different IAM endpoint. Empty keeps the default.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.url = url;
        }
        self
    }

    /// Send OAuth client credentials with each token request.
    #[must_use]
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.options.client_id = Some(client_id.into());
        self.options.client_secret = Some(client_secret.into());
        self
    }

    /// Request a specific scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.options.scope = Some(scope.into());
        self
    }

    /// Use a specific HTTP client for token requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    async fn request_token(&self) -> Result<AccessToken, Error> {
        let cr_token = tokio::fs::read_to_string(&self.cr_token_filename)
            .await
            .map_err(|e| Error::Authentication {
                status_code: None,
                message: format!(
                    "failed to read compute resource token from '{}': {e}",
                    self.cr_token_filename
                ),
            })?;
        let cr_token = cr_token.trim();

        let mut form = vec![("grant_type", GRANT_TYPE_CR_TOKEN), ("cr_token", cr_token)];
        if let Some(name) = &self.iam_profile_name {
            form.push(("profile_name", name.as_str()));
        }
        if let Some(id) = &self.iam_profile_id {
            form.push(("profile_id", id.as_str()));
        }
        self.options.push_scope(&mut form);
        iam_form_exchange(&self.http, &self.url, &self.options, &form).await
    }
}

impl fmt::Debug for ContainerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerAuthenticator")
            .field("cr_token_filename", &self.cr_token_filename)
            .field("iam_profile_name", &self.iam_profile_name)
            .field("iam_profile_id", &self.iam_profile_id)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for ContainerAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::Container
    }

    fn validate(&self) -> Result<(), Error> {
        if self.iam_profile_name.as_deref().is_none_or(str::is_empty)
            && self.iam_profile_id.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::validation(
                "at least one of iam_profile_name or iam_profile_id must be specified",
            ));
        }
        self.options.validate()
    }

    async fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        let token = self.cache.get_or_refresh(|| self.request_token()).await?;
        request.headers.set("Authorization", format!("Bearer {token}"));
        Ok(())
    }
}

// =========================================================================
// Cloud Pak for Data
// =========================================================================

#[derive(Clone)]
enum Cp4dSecret {
    Password(String),
    ApiKey(String),
}

/// Obtains a bearer token from a Cloud Pak for Data cluster.
pub struct CloudPakForDataAuthenticator {
    url: String,
    username: String,
    secret: Cp4dSecret,
    http: Client,
    cache: TokenCache,
}

impl CloudPakForDataAuthenticator {
    /// Authenticate with a username and password.
    pub fn with_password(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::build(url.into(), username.into(), Cp4dSecret::Password(password.into()))
    }

    /// Authenticate with a username and API key.
    pub fn with_apikey(
        url: impl Into<String>,
        username: impl Into<String>,
        apikey: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::build(url.into(), username.into(), Cp4dSecret::ApiKey(apikey.into()))
    }

    fn build(url: String, username: String, secret: Cp4dSecret) -> Result<Self, Error> {
        let auth = Self {
            url,
            username,
            secret,
            http: token_client()?,
            cache: TokenCache::default(),
        };
        auth.validate()?;
        Ok(auth)
    }

    /// Use a specific HTTP client for token requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    async fn request_token(&self) -> Result<AccessToken, Error> {
        let body = match &self.secret {
            Cp4dSecret::Password(password) => {
                serde_json::json!({"username": self.username, "password": password})
            }
            Cp4dSecret::ApiKey(apikey) => {
                serde_json::json!({"username": self.username, "api_key": apikey})
            }
        };
        let url = format!(
            "{}{CP4D_TOKEN_PATH}",
            self.url.trim_end_matches('/').trim_end_matches(CP4D_TOKEN_PATH)
        );
        let request = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .json(&body);
        let response: Cp4dTokenResponse = send_token_request(request).await?;
        let now = Utc::now().timestamp();
        let expires_at = jwt_expiry(&response.token).unwrap_or(now + FALLBACK_LIFETIME_SECS);
        Ok(AccessToken {
            value: response.token,
            expires_at,
        })
    }
}

impl fmt::Debug for CloudPakForDataAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudPakForDataAuthenticator")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for CloudPakForDataAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::Cp4d
    }

    fn validate(&self) -> Result<(), Error> {
        if self.url.is_empty() {
            return Err(Error::validation("the url property is required"));
        }
        require_credential("username", &self.username)?;
        match &self.secret {
            Cp4dSecret::Password(password) => require_credential("password", password),
            Cp4dSecret::ApiKey(apikey) => require_credential("apikey", apikey),
        }
    }

    async fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        let token = self.cache.get_or_refresh(|| self.request_token()).await?;
        request.headers.set("Authorization", format!("Bearer {token}"));
        Ok(())
    }
}

// =========================================================================
// IAM assume (trusted profile)
// =========================================================================

#[derive(Debug, Clone)]
enum TrustedProfile {
    Id(String),
    Crn(String),
    Name { name: String, account_id: String },
}

/// Obtains an IAM token from an API key, then exchanges it for a token of a
/// trusted profile.
pub struct IamAssumeAuthenticator {
    delegate: IamAuthenticator,
    profile: TrustedProfile,
    cache: TokenCache,
}

impl IamAssumeAuthenticator {
    /// Assume the profile with this id.
    pub fn with_profile_id(
        apikey: impl Into<String>,
        profile_id: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::build(apikey.into(), TrustedProfile::Id(profile_id.into()))
    }

    /// Assume the profile with this CRN.
    pub fn with_profile_crn(
        apikey: impl Into<String>,
        profile_crn: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::build(apikey.into(), TrustedProfile::Crn(profile_crn.into()))
    }

    /// Assume the profile with this name in `account_id`.
    pub fn with_profile_name(
        apikey: impl Into<String>,
        profile_name: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::build(
            apikey.into(),
            TrustedProfile::Name {
                name: profile_name.into(),
                account_id: account_id.into(),
            },
        )
    }

    fn build(apikey: String, profile: TrustedProfile) -> Result<Self, Error> {
        let auth = Self {
            delegate: IamAuthenticator::new(apikey)?,
            profile,
            cache: TokenCache::default(),
        };
        auth.validate()?;
        Ok(auth)
    }

    /// Use a different IAM endpoint. Empty keeps the default.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.delegate = self.delegate.with_url(url);
        self
    }

    /// Use a specific HTTP client for token requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.delegate = self.delegate.with_http_client(http);
        self
    }

    async fn request_token(&self) -> Result<AccessToken, Error> {
        let user_token = self.delegate.request_token().await?;
        let mut form = vec![
            ("grant_type", GRANT_TYPE_ASSUME),
            ("access_token", user_token.value.as_str()),
        ];
        match &self.profile {
            TrustedProfile::Id(id) => form.push(("profile_id", id.as_str())),
            TrustedProfile::Crn(crn) => form.push(("profile_crn", crn.as_str())),
            TrustedProfile::Name { name, account_id } => {
                form.push(("profile_name", name.as_str()));
                form.push(("account", account_id.as_str()));
            }
        }
        iam_form_exchange(
            &self.delegate.http,
            &self.delegate.url,
            &IamClientOptions::default(),
            &form,
        )
        .await
    }
}

impl fmt::Debug for IamAssumeAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamAssumeAuthenticator")
            .field("delegate", &self.delegate)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for IamAssumeAuthenticator {
    fn auth_type(&self) -> AuthType {
        AuthType::IamAssume
    }

    fn validate(&self) -> Result<(), Error> {
        self.delegate.validate()?;
        let ok = match &self.profile {
            TrustedProfile::Id(v) | TrustedProfile::Crn(v) => !v.is_empty(),
            TrustedProfile::Name { name, account_id } => {
                !name.is_empty() && !account_id.is_empty()
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::validation(
                "exactly one of profile id, profile CRN or profile name with account id must be specified",
            ))
        }
    }

    async fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        let token = self.cache.get_or_refresh(|| self.request_token()).await?;
        request.headers.set("Authorization", format!("Bearer {token}"));
        Ok(())
    }
}
