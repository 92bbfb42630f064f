//! Client for the Security and Compliance Center admin service.
//!
//! Reads and updates instance settings (event notifications and object
//! storage) and sends test events.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scc_admin::{AdminService, AdminServiceOptions, GetSettingsOptions};
//! use scc_core::IamAuthenticator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), scc_core::Error> {
//!     let auth = Arc::new(IamAuthenticator::new("my-api-key")?);
//!     let service = AdminService::new(AdminServiceOptions::new(auth))?;
//!
//!     let response = service.get_settings(&GetSettingsOptions::new()).await?;
//!     if let Some(settings) = response.result {
//!         println!("{settings:?}");
//!     }
//!     Ok(())
//! }
//! ```

mod models;
mod settings;

pub use models::{
    EventNotifications, GetSettingsOptions, JsonPatchOp, JsonPatchOperation, ObjectStorage,
    PostTestEventOptions, Settings, TestEvent, UpdateSettingsOptions,
};

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use scc_core::{Authenticator, BaseService, Error, ServiceProperties};

/// Default base URL.
pub const DEFAULT_SERVICE_URL: &str =
    "https://us-south.compliance.cloud.ibm.com/instances/instance_id/v3";

/// Name used to look up external configuration (`ADMIN_SERVICE_API_*`).
pub const DEFAULT_SERVICE_NAME: &str = "admin_service_api";

/// Version reported in the SDK analytics header.
pub const SERVICE_VERSION: &str = "V3";

/// Base URL template accepted by [`AdminService::construct_service_url`].
pub const PARAMETERIZED_SERVICE_URL: &str =
    "https://{environment}.cloud.ibm.com/instances/{instance_id}/v3";

const DEFAULT_URL_VARIABLES: [(&str, &str); 2] = [
    ("environment", "us-south.compliance"),
    ("instance_id", "instance_id"),
];

/// Construction options for [`AdminService`].
#[derive(Debug, Clone)]
pub struct AdminServiceOptions {
    /// Base URL; [`DEFAULT_SERVICE_URL`] when absent.
    pub url: Option<String>,
    /// Credentials applied to every request.
    pub authenticator: Arc<dyn Authenticator>,
}

impl AdminServiceOptions {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            url: None,
            authenticator,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Handle for the admin service.
///
/// Dereferences to [`BaseService`] for URL, retry, gzip, header and
/// transport configuration.
#[derive(Debug, Clone)]
pub struct AdminService {
    base: BaseService,
}

impl AdminService {
    /// Create a handle from explicit options.
    pub fn new(options: AdminServiceOptions) -> Result<Self, Error> {
        let url = options.url.as_deref().unwrap_or(DEFAULT_SERVICE_URL);
        Ok(Self {
            base: BaseService::new(url, options.authenticator)?,
        })
    }

    /// Create a handle configured from `ADMIN_SERVICE_API_*` properties in
    /// the credentials file or the environment.
    pub fn from_environment() -> Result<Self, Error> {
        Self::from_properties(&ServiceProperties::load(DEFAULT_SERVICE_NAME))
    }

    /// Create a handle from already-loaded properties.
    pub fn from_properties(props: &ServiceProperties) -> Result<Self, Error> {
        let authenticator = scc_core::authenticator_from_properties(props)?;
        let mut base = BaseService::new(DEFAULT_SERVICE_URL, authenticator)?;
        base.configure(props)?;
        Ok(Self { base })
    }

    /// Build a base URL from [`PARAMETERIZED_SERVICE_URL`].
    ///
    /// Recognised variables are `environment` (default
    /// `us-south.compliance`) and `instance_id`.
    pub fn construct_service_url(
        provided: &HashMap<String, String>,
    ) -> Result<String, Error> {
        let defaults: HashMap<&str, &str> = DEFAULT_URL_VARIABLES.into_iter().collect();
        scc_core::construct_service_url(PARAMETERIZED_SERVICE_URL, &defaults, provided)
    }
}

impl Deref for AdminService {
    type Target = BaseService;

    fn deref(&self) -> &BaseService {
        &self.base
    }
}

impl DerefMut for AdminService {
    fn deref_mut(&mut self) -> &mut BaseService {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use scc_core::NoAuthAuthenticator;

    use super::*;

    #[test]
    fn construct_service_url_defaults_and_overrides() {
        assert_eq!(
            AdminService::construct_service_url(&HashMap::new()).unwrap(),
            DEFAULT_SERVICE_URL
        );
        let provided = HashMap::from([
            ("environment".to_owned(), "eu-de.compliance".to_owned()),
            ("instance_id".to_owned(), "abc".to_owned()),
        ]);
        assert_eq!(
            AdminService::construct_service_url(&provided).unwrap(),
            "https://eu-de.compliance.cloud.ibm.com/instances/abc/v3"
        );
    }

    #[test]
    fn construct_service_url_rejects_unknown_variables() {
        let provided = HashMap::from([("region".to_owned(), "x".to_owned())]);
        let err = AdminService::construct_service_url(&provided).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn default_url_is_used() {
        let service =
            AdminService::new(AdminServiceOptions::new(Arc::new(NoAuthAuthenticator))).unwrap();
        assert_eq!(service.service_url(), DEFAULT_SERVICE_URL);
    }

    #[test]
    fn from_properties_applies_url_and_auth() {
        let props = ServiceProperties::from_pairs([
            ("AUTH_TYPE", "bearerToken"),
            ("BEARER_TOKEN", "tok"),
            ("URL", "https://admin.example.com/instances/i/v3"),
        ]);
        let service = AdminService::from_properties(&props).unwrap();
        assert_eq!(service.service_url(), "https://admin.example.com/instances/i/v3");
        assert_eq!(
            service.authenticator().auth_type(),
            scc_core::AuthType::BearerToken
        );
    }
}
