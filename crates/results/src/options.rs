//! Per-operation options.
//!
//! Required identifiers are constructor arguments; optional filters are
//! public fields, set directly or with struct-update syntax:
//!
//! ```
//! use scc_results::ListReportsOptions;
//!
//! let options = ListReportsOptions {
//!     limit: Some(25),
//!     ..ListReportsOptions::new("my-instance")
//! };
//! assert_eq!(options.instance_id, "my-instance");
//! ```

use scc_core::{Error, Headers};

use crate::models::{AggregatedStatus, EvaluationStatus, ReportType};

/// Adds the correlation id and header setters shared by every options type.
macro_rules! call_headers {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $name {
                /// Send `X-Correlation-Id` with the request.
                #[must_use]
                pub fn with_x_correlation_id(mut self, id: impl Into<String>) -> Self {
                    self.x_correlation_id = Some(id.into());
                    self
                }

                /// Send extra headers with the request.
                #[must_use]
                pub fn with_headers(mut self, headers: Headers) -> Self {
                    self.headers = headers;
                    self
                }
            }
        )+
    };
}

fn require(name: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::validation(format!("{name} must not be empty")));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct GetLatestReportsOptions {
    pub instance_id: String,
    /// Account that owns the instance, when it differs from the caller's.
    pub home_account_id: Option<String>,
    /// `profile_name`
    pub sort: Option<String>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetLatestReportsOptions {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            home_account_id: None,
            sort: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)
    }
}

#[derive(Debug, Clone)]
pub struct ListReportsOptions {
    pub instance_id: String,
    pub home_account_id: Option<String>,
    pub attachment_id: Option<String>,
    pub group_id: Option<String>,
    pub profile_id: Option<String>,
    pub scope_id: Option<String>,
    pub report_type: Option<ReportType>,
    /// Cursor from a previous page. Must stay unset when building a pager.
    pub start: Option<String>,
    pub limit: Option<i64>,
    /// `profile_name` or `scope_id`
    pub sort: Option<String>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl ListReportsOptions {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            home_account_id: None,
            attachment_id: None,
            group_id: None,
            profile_id: None,
            scope_id: None,
            report_type: None,
            start: None,
            limit: None,
            sort: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)
    }
}

#[derive(Debug, Clone)]
pub struct GetReportsProfilesOptions {
    pub instance_id: String,
    pub home_account_id: Option<String>,
    pub report_id: Option<String>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetReportsProfilesOptions {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            home_account_id: None,
            report_id: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)
    }
}

#[derive(Debug, Clone)]
pub struct GetReportsScopesOptions {
    pub instance_id: String,
    pub home_account_id: Option<String>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetReportsScopesOptions {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            home_account_id: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)
    }
}

/// Options for operations addressing one report and nothing else:
/// `get_report`, `get_report_summary` and `get_report_evaluation`.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub instance_id: String,
    pub report_id: String,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl ReportOptions {
    pub fn new(instance_id: impl Into<String>, report_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            report_id: report_id.into(),
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)?;
        require("report_id", &self.report_id)
    }
}

pub type GetReportOptions = ReportOptions;
pub type GetReportSummaryOptions = ReportOptions;
pub type GetReportEvaluationOptions = ReportOptions;

#[derive(Debug, Clone)]
pub struct GetReportControlsOptions {
    pub instance_id: String,
    pub report_id: String,
    pub control_id: Option<String>,
    pub control_name: Option<String>,
    pub control_description: Option<String>,
    pub control_category: Option<String>,
    pub status: Option<AggregatedStatus>,
    /// `control_name`, `control_category` or `status`
    pub sort: Option<String>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetReportControlsOptions {
    pub fn new(instance_id: impl Into<String>, report_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            report_id: report_id.into(),
            control_id: None,
            control_name: None,
            control_description: None,
            control_category: None,
            status: None,
            sort: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)?;
        require("report_id", &self.report_id)
    }
}

#[derive(Debug, Clone)]
pub struct GetReportRuleOptions {
    pub instance_id: String,
    pub report_id: String,
    pub rule_id: String,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetReportRuleOptions {
    pub fn new(
        instance_id: impl Into<String>,
        report_id: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            report_id: report_id.into(),
            rule_id: rule_id.into(),
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)?;
        require("report_id", &self.report_id)?;
        require("rule_id", &self.rule_id)
    }
}

#[derive(Debug, Clone)]
pub struct ListReportEvaluationsOptions {
    pub instance_id: String,
    pub report_id: String,
    pub assessment_id: Option<String>,
    pub component_id: Option<String>,
    pub target_id: Option<String>,
    pub target_name: Option<String>,
    pub status: Option<EvaluationStatus>,
    /// Cursor from a previous page. Must stay unset when building a pager.
    pub start: Option<String>,
    pub limit: Option<i64>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl ListReportEvaluationsOptions {
    pub fn new(instance_id: impl Into<String>, report_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            report_id: report_id.into(),
            assessment_id: None,
            component_id: None,
            target_id: None,
            target_name: None,
            status: None,
            start: None,
            limit: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)?;
        require("report_id", &self.report_id)
    }
}

#[derive(Debug, Clone)]
pub struct ListReportResourcesOptions {
    pub instance_id: String,
    pub report_id: String,
    /// Resource CRN.
    pub id: Option<String>,
    pub resource_name: Option<String>,
    pub account_id: Option<String>,
    pub component_id: Option<String>,
    pub status: Option<AggregatedStatus>,
    /// Cursor from a previous page. Must stay unset when building a pager.
    pub start: Option<String>,
    pub limit: Option<i64>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl ListReportResourcesOptions {
    pub fn new(instance_id: impl Into<String>, report_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            report_id: report_id.into(),
            id: None,
            resource_name: None,
            account_id: None,
            component_id: None,
            status: None,
            start: None,
            limit: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)?;
        require("report_id", &self.report_id)
    }
}

#[derive(Debug, Clone)]
pub struct GetReportTagsOptions {
    pub report_id: String,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetReportTagsOptions {
    pub fn new(report_id: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("report_id", &self.report_id)
    }
}

#[derive(Debug, Clone)]
pub struct GetReportViolationsDriftOptions {
    pub instance_id: String,
    pub report_id: String,
    /// Look-back window in days.
    pub scan_time_duration: Option<i64>,
    pub x_correlation_id: Option<String>,
    pub headers: Headers,
}

impl GetReportViolationsDriftOptions {
    pub fn new(instance_id: impl Into<String>, report_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            report_id: report_id.into(),
            scan_time_duration: None,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        require("instance_id", &self.instance_id)?;
        require("report_id", &self.report_id)
    }
}

call_headers!(
    GetLatestReportsOptions,
    ListReportsOptions,
    GetReportsProfilesOptions,
    GetReportsScopesOptions,
    ReportOptions,
    GetReportControlsOptions,
    GetReportRuleOptions,
    ListReportEvaluationsOptions,
    ListReportResourcesOptions,
    GetReportTagsOptions,
    GetReportViolationsDriftOptions,
);
