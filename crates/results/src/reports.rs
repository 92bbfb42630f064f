use std::collections::HashMap;

use scc_core::{
    ByteStream, CONTENT_TYPE_CSV, CallContext, DetailedResponse, Error, Headers, Method,
    RequestBuilder, sdk_headers,
};

use crate::models::{
    EvaluationPage, GetLatestReportsResponse, GetReportControlsResponse,
    GetReportViolationsDriftResult, Report, ReportPage, ReportProfiles, ReportScopes,
    ReportSummary, ReportTags, ResourcePage, Rule,
};
use crate::options::{
    GetLatestReportsOptions, GetReportControlsOptions, GetReportRuleOptions,
    GetReportTagsOptions, GetReportViolationsDriftOptions, GetReportsProfilesOptions,
    GetReportsScopesOptions, ListReportEvaluationsOptions, ListReportResourcesOptions,
    ListReportsOptions, ReportOptions,
};
use crate::{DEFAULT_SERVICE_NAME, ResultsService, SERVICE_VERSION};

impl ResultsService {
    /// A GET request with the SDK and caller headers applied.
    fn get_request(
        &self,
        ctx: &CallContext,
        path: &str,
        path_params: &HashMap<&str, &str>,
        operation_id: &str,
        correlation_id: Option<&str>,
        headers: &Headers,
    ) -> Result<RequestBuilder, Error> {
        let mut builder = self.request_builder(Method::Get, path, path_params, ctx)?;
        builder
            .add_headers(&sdk_headers(DEFAULT_SERVICE_NAME, SERVICE_VERSION, operation_id))
            .add_call_headers(correlation_id, headers);
        Ok(builder)
    }

    /// Latest report of every report group.
    pub async fn get_latest_reports(
        &self,
        options: &GetLatestReportsOptions,
    ) -> Result<DetailedResponse<GetLatestReportsResponse>, Error> {
        self.get_latest_reports_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_latest_reports_with_context(
        &self,
        ctx: &CallContext,
        options: &GetLatestReportsOptions,
    ) -> Result<DetailedResponse<GetLatestReportsResponse>, Error> {
        options.validate()?;
        let params = HashMap::from([("instance_id", options.instance_id.as_str())]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/latest",
            &params,
            "GetLatestReports",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder
            .add_optional_query("home_account_id", options.home_account_id.as_deref())
            .add_optional_query("sort", options.sort.as_deref());
        self.execute("get_latest_reports", builder.build()?).await
    }

    /// One page of reports.
    pub async fn list_reports(
        &self,
        options: &ListReportsOptions,
    ) -> Result<DetailedResponse<ReportPage>, Error> {
        self.list_reports_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn list_reports_with_context(
        &self,
        ctx: &CallContext,
        options: &ListReportsOptions,
    ) -> Result<DetailedResponse<ReportPage>, Error> {
        options.validate()?;
        let params = HashMap::from([("instance_id", options.instance_id.as_str())]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports",
            &params,
            "ListReports",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder
            .add_optional_query("home_account_id", options.home_account_id.as_deref())
            .add_optional_query("attachment_id", options.attachment_id.as_deref())
            .add_optional_query("group_id", options.group_id.as_deref())
            .add_optional_query("profile_id", options.profile_id.as_deref())
            .add_optional_query("scope_id", options.scope_id.as_deref())
            .add_optional_query("type", options.report_type.as_ref())
            .add_optional_query("start", options.start.as_deref())
            .add_optional_query("limit", options.limit)
            .add_optional_query("sort", options.sort.as_deref());
        self.execute("list_reports", builder.build()?).await
    }

    /// Profiles that have reports.
    pub async fn get_reports_profiles(
        &self,
        options: &GetReportsProfilesOptions,
    ) -> Result<DetailedResponse<ReportProfiles>, Error> {
        self.get_reports_profiles_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_reports_profiles_with_context(
        &self,
        ctx: &CallContext,
        options: &GetReportsProfilesOptions,
    ) -> Result<DetailedResponse<ReportProfiles>, Error> {
        options.validate()?;
        let params = HashMap::from([("instance_id", options.instance_id.as_str())]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/profiles",
            &params,
            "GetReportsProfiles",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder
            .add_optional_query("home_account_id", options.home_account_id.as_deref())
            .add_optional_query("report_id", options.report_id.as_deref());
        self.execute("get_reports_profiles", builder.build()?).await
    }

    /// Scopes that have reports.
    pub async fn get_reports_scopes(
        &self,
        options: &GetReportsScopesOptions,
    ) -> Result<DetailedResponse<ReportScopes>, Error> {
        self.get_reports_scopes_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_reports_scopes_with_context(
        &self,
        ctx: &CallContext,
        options: &GetReportsScopesOptions,
    ) -> Result<DetailedResponse<ReportScopes>, Error> {
        options.validate()?;
        let params = HashMap::from([("instance_id", options.instance_id.as_str())]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/scopes",
            &params,
            "GetReportsScopes",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder.add_optional_query("home_account_id", options.home_account_id.as_deref());
        self.execute("get_reports_scopes", builder.build()?).await
    }

    /// A single report.
    pub async fn get_report(
        &self,
        options: &ReportOptions,
    ) -> Result<DetailedResponse<Report>, Error> {
        self.get_report_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_with_context(
        &self,
        ctx: &CallContext,
        options: &ReportOptions,
    ) -> Result<DetailedResponse<Report>, Error> {
        let builder = self.report_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}",
            "GetReport",
            options,
        )?;
        self.execute("get_report", builder.build()?).await
    }

    /// Score and counts of a report.
    pub async fn get_report_summary(
        &self,
        options: &ReportOptions,
    ) -> Result<DetailedResponse<ReportSummary>, Error> {
        self.get_report_summary_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_summary_with_context(
        &self,
        ctx: &CallContext,
        options: &ReportOptions,
    ) -> Result<DetailedResponse<ReportSummary>, Error> {
        let builder = self.report_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/summary",
            "GetReportSummary",
            options,
        )?;
        self.execute("get_report_summary", builder.build()?).await
    }

    /// Download every evaluation of a report as CSV.
    ///
    /// The body is returned unread; the caller consumes and drops it.
    pub async fn get_report_evaluation(
        &self,
        options: &ReportOptions,
    ) -> Result<DetailedResponse<ByteStream>, Error> {
        self.get_report_evaluation_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_evaluation_with_context(
        &self,
        ctx: &CallContext,
        options: &ReportOptions,
    ) -> Result<DetailedResponse<ByteStream>, Error> {
        let mut builder = self.report_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/download",
            "GetReportEvaluation",
            options,
        )?;
        builder.add_headers(&Headers::new().with("Accept", CONTENT_TYPE_CSV));
        self.execute_stream("get_report_evaluation", builder.build()?)
            .await
    }

    fn report_request(
        &self,
        ctx: &CallContext,
        path: &str,
        operation_id: &str,
        options: &ReportOptions,
    ) -> Result<RequestBuilder, Error> {
        options.validate()?;
        let params = HashMap::from([
            ("instance_id", options.instance_id.as_str()),
            ("report_id", options.report_id.as_str()),
        ]);
        self.get_request(
            ctx,
            path,
            &params,
            operation_id,
            options.x_correlation_id.as_deref(),
            &options.headers,
        )
    }

    /// Controls of a report, optionally filtered.
    pub async fn get_report_controls(
        &self,
        options: &GetReportControlsOptions,
    ) -> Result<DetailedResponse<GetReportControlsResponse>, Error> {
        self.get_report_controls_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_controls_with_context(
        &self,
        ctx: &CallContext,
        options: &GetReportControlsOptions,
    ) -> Result<DetailedResponse<GetReportControlsResponse>, Error> {
        options.validate()?;
        let params = HashMap::from([
            ("instance_id", options.instance_id.as_str()),
            ("report_id", options.report_id.as_str()),
        ]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/controls",
            &params,
            "GetReportControls",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder
            .add_optional_query("control_id", options.control_id.as_deref())
            .add_optional_query("control_name", options.control_name.as_deref())
            .add_optional_query("control_description", options.control_description.as_deref())
            .add_optional_query("control_category", options.control_category.as_deref())
            .add_optional_query("status", options.status.as_ref())
            .add_optional_query("sort", options.sort.as_deref());
        self.execute("get_report_controls", builder.build()?).await
    }

    /// A rule referenced by a report.
    pub async fn get_report_rule(
        &self,
        options: &GetReportRuleOptions,
    ) -> Result<DetailedResponse<Rule>, Error> {
        self.get_report_rule_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_rule_with_context(
        &self,
        ctx: &CallContext,
        options: &GetReportRuleOptions,
    ) -> Result<DetailedResponse<Rule>, Error> {
        options.validate()?;
        let params = HashMap::from([
            ("instance_id", options.instance_id.as_str()),
            ("report_id", options.report_id.as_str()),
            ("rule_id", options.rule_id.as_str()),
        ]);
        let builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/rules/{rule_id}",
            &params,
            "GetReportRule",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        self.execute("get_report_rule", builder.build()?).await
    }

    /// One page of evaluations of a report.
    pub async fn list_report_evaluations(
        &self,
        options: &ListReportEvaluationsOptions,
    ) -> Result<DetailedResponse<EvaluationPage>, Error> {
        self.list_report_evaluations_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn list_report_evaluations_with_context(
        &self,
        ctx: &CallContext,
        options: &ListReportEvaluationsOptions,
    ) -> Result<DetailedResponse<EvaluationPage>, Error> {
        options.validate()?;
        let params = HashMap::from([
            ("instance_id", options.instance_id.as_str()),
            ("report_id", options.report_id.as_str()),
        ]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/evaluations",
            &params,
            "ListReportEvaluations",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder
            .add_optional_query("assessment_id", options.assessment_id.as_deref())
            .add_optional_query("component_id", options.component_id.as_deref())
            .add_optional_query("target_id", options.target_id.as_deref())
            .add_optional_query("target_name", options.target_name.as_deref())
            .add_optional_query("status", options.status.as_ref())
            .add_optional_query("start", options.start.as_deref())
            .add_optional_query("limit", options.limit);
        self.execute("list_report_evaluations", builder.build()?).await
    }

    /// One page of resources of a report.
    pub async fn list_report_resources(
        &self,
        options: &ListReportResourcesOptions,
    ) -> Result<DetailedResponse<ResourcePage>, Error> {
        self.list_report_resources_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn list_report_resources_with_context(
        &self,
        ctx: &CallContext,
        options: &ListReportResourcesOptions,
    ) -> Result<DetailedResponse<ResourcePage>, Error> {
        options.validate()?;
        let params = HashMap::from([
            ("instance_id", options.instance_id.as_str()),
            ("report_id", options.report_id.as_str()),
        ]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/resources",
            &params,
            "ListReportResources",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder
            .add_optional_query("id", options.id.as_deref())
            .add_optional_query("resource_name", options.resource_name.as_deref())
            .add_optional_query("account_id", options.account_id.as_deref())
            .add_optional_query("component_id", options.component_id.as_deref())
            .add_optional_query("status", options.status.as_ref())
            .add_optional_query("start", options.start.as_deref())
            .add_optional_query("limit", options.limit);
        self.execute("list_report_resources", builder.build()?).await
    }

    /// Tags on the resources of a report.
    pub async fn get_report_tags(
        &self,
        options: &GetReportTagsOptions,
    ) -> Result<DetailedResponse<ReportTags>, Error> {
        self.get_report_tags_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_tags_with_context(
        &self,
        ctx: &CallContext,
        options: &GetReportTagsOptions,
    ) -> Result<DetailedResponse<ReportTags>, Error> {
        options.validate()?;
        let params = HashMap::from([("report_id", options.report_id.as_str())]);
        let builder = self.get_request(
            ctx,
            "/v3/reports/{report_id}/tags",
            &params,
            "GetReportTags",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        self.execute("get_report_tags", builder.build()?).await
    }

    /// How control violations changed over earlier scans of the report's
    /// group.
    pub async fn get_report_violations_drift(
        &self,
        options: &GetReportViolationsDriftOptions,
    ) -> Result<DetailedResponse<GetReportViolationsDriftResult>, Error> {
        self.get_report_violations_drift_with_context(&CallContext::background(), options)
            .await
    }

    pub async fn get_report_violations_drift_with_context(
        &self,
        ctx: &CallContext,
        options: &GetReportViolationsDriftOptions,
    ) -> Result<DetailedResponse<GetReportViolationsDriftResult>, Error> {
        options.validate()?;
        let params = HashMap::from([
            ("instance_id", options.instance_id.as_str()),
            ("report_id", options.report_id.as_str()),
        ]);
        let mut builder = self.get_request(
            ctx,
            "/instances/{instance_id}/v3/reports/{report_id}/violations_drift",
            &params,
            "GetReportViolationsDrift",
            options.x_correlation_id.as_deref(),
            &options.headers,
        )?;
        builder.add_optional_query("scan_time_duration", options.scan_time_duration);
        self.execute("get_report_violations_drift", builder.build()?)
            .await
    }
}
