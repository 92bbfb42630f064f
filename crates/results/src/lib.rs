//! Client for the Security and Compliance Center results and reports service.
//!
//! Lists scan reports and drills into their controls, evaluations,
//! resources, rules, tags and violation drift. List operations have pagers
//! that follow the server's `next` links.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use scc_results::{ListReportsOptions, ResultsService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), scc_core::Error> {
//!     // RESULTS_REPORTS_API_URL, RESULTS_REPORTS_API_APIKEY, ...
//!     let service = ResultsService::from_environment()?;
//!
//!     let pager = service.new_reports_pager(ListReportsOptions {
//!         limit: Some(50),
//!         ..ListReportsOptions::new("my-instance-id")
//!     })?;
//!     let reports: Vec<_> = pager.into_stream().try_collect().await?;
//!     println!("{} reports", reports.len());
//!     Ok(())
//! }
//! ```

mod models;
mod options;
mod pagers;
mod reports;

pub use models::*;
pub use options::*;
pub use pagers::{
    ReportEvaluationsFetcher, ReportEvaluationsPager, ReportResourcesFetcher,
    ReportResourcesPager, ReportsFetcher, ReportsPager,
};

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use scc_core::{Authenticator, BaseService, Error, ServiceProperties};

/// Default base URL.
pub const DEFAULT_SERVICE_URL: &str = "https://us-south.compliance.cloud.ibm.com";

/// Name used to look up external configuration (`RESULTS_REPORTS_API_*`).
pub const DEFAULT_SERVICE_NAME: &str = "results_reports_api";

/// Version reported in the SDK analytics header.
pub const SERVICE_VERSION: &str = "V3";

/// Base URL template accepted by [`ResultsService::construct_service_url`].
pub const PARAMETERIZED_SERVICE_URL: &str = "https://{environment}.cloud.ibm.com";

const DEFAULT_URL_VARIABLES: [(&str, &str); 1] = [("environment", "us-south.compliance")];

/// Construction options for [`ResultsService`].
#[derive(Debug, Clone)]
pub struct ResultsServiceOptions {
    /// Base URL; [`DEFAULT_SERVICE_URL`] when absent.
    pub url: Option<String>,
    /// Credentials applied to every request.
    pub authenticator: Arc<dyn Authenticator>,
}

impl ResultsServiceOptions {
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

/// Handle for the results and reports service.
///
/// Dereferences to [`BaseService`] for URL, retry, gzip, header and
/// transport configuration.
#[derive(Debug, Clone)]
pub struct ResultsService {
    base: BaseService,
}

impl ResultsService {
    /// Create a handle from explicit options.
    pub fn new(options: ResultsServiceOptions) -> Result<Self, Error> {
        let url = options.url.as_deref().unwrap_or(DEFAULT_SERVICE_URL);
        Ok(Self {
            base: BaseService::new(url, options.authenticator)?,
        })
    }

    /// Create a handle configured from `RESULTS_REPORTS_API_*` properties in
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
    /// The only variable is `environment` (default `us-south.compliance`).
    pub fn construct_service_url(
        provided: &HashMap<String, String>,
    ) -> Result<String, Error> {
        let defaults: HashMap<&str, &str> = DEFAULT_URL_VARIABLES.into_iter().collect();
        scc_core::construct_service_url(PARAMETERIZED_SERVICE_URL, &defaults, provided)
    }
}

impl Deref for ResultsService {
    type Target = BaseService;

    fn deref(&self) -> &BaseService {
        &self.base
    }
}

impl DerefMut for ResultsService {
    fn deref_mut(&mut self) -> &mut BaseService {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_service_url_defaults_and_overrides() {
        assert_eq!(
            ResultsService::construct_service_url(&HashMap::new()).unwrap(),
            DEFAULT_SERVICE_URL
        );
        let provided = HashMap::from([("environment".to_owned(), "eu-de.compliance".to_owned())]);
        assert_eq!(
            ResultsService::construct_service_url(&provided).unwrap(),
            "https://eu-de.compliance.cloud.ibm.com"
        );
        let typo = HashMap::from([("enviroment".to_owned(), "x".to_owned())]);
        assert!(matches!(
            ResultsService::construct_service_url(&typo),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn from_properties_applies_retries() {
        let props = ServiceProperties::from_pairs([
            ("AUTH_TYPE", "noauth"),
            ("ENABLE_RETRIES", "true"),
            ("MAX_RETRIES", "0"),
        ]);
        let service = ResultsService::from_properties(&props).unwrap();
        assert_eq!(service.service_url(), DEFAULT_SERVICE_URL);
        assert!(service.retry_policy().enabled);
        assert_eq!(service.retry_policy().max_retries, scc_core::retry::DEFAULT_MAX_RETRIES);
    }
}
