use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use scc_core::{CallContext, Error, NoAuthAuthenticator, RetryPolicy, TransportError};
use scc_mock_server::{MockResponse, MockServer};
use scc_results::{
    AggregatedStatus, EvaluationStatus, GetLatestReportsOptions, GetReportControlsOptions,
    GetReportRuleOptions, GetReportTagsOptions, GetReportViolationsDriftOptions,
    GetReportsProfilesOptions, GetReportsScopesOptions,
    ListReportEvaluationsOptions, ListReportResourcesOptions, ListReportsOptions, ReportOptions,
    ReportType, ResultsService, ResultsServiceOptions,
};
use serde_json::json;

fn service(server: &MockServer) -> ResultsService {
    ResultsService::new(
        ResultsServiceOptions::new(Arc::new(NoAuthAuthenticator)).with_url(server.url()),
    )
    .unwrap()
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy::enabled(max_retries, Duration::from_secs(1))
        .with_base_interval(Duration::from_millis(5))
}

fn report_page(id: &str, next: Option<&str>) -> serde_json::Value {
    let mut page = json!({
        "total_count": 2,
        "limit": 1,
        "first": {"href": "/instances/inst/v3/reports?limit=1"},
        "reports": [{"id": id, "type": "scheduled"}]
    });
    if let Some(href) = next {
        page["next"] = json!({"href": href});
    }
    page
}

#[tokio::test]
async fn reports_pager_follows_next_links() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        report_page("R1", Some("https://x/instances/inst/v3/reports?limit=1&start=tok-2")),
    ));
    server.enqueue(MockResponse::json(200, report_page("R2", None)));

    let options = ListReportsOptions {
        limit: Some(1),
        ..ListReportsOptions::new("inst")
    };
    let mut pager = service(&server).new_reports_pager(options).unwrap();
    let reports = pager.get_all().await.unwrap();

    let ids: Vec<_> = reports.iter().filter_map(|r| r.id.as_deref()).collect();
    assert_eq!(ids, ["R1", "R2"]);
    assert_eq!(reports[0].report_type, Some(ReportType::Scheduled));
    assert!(!pager.has_next());
    assert_eq!(pager.pages_fetched(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/instances/inst/v3/reports");
    assert!(!requests[0].query_params().contains_key("start"));
    assert_eq!(requests[1].query_params()["start"], "tok-2");
    assert_eq!(requests[1].query_params()["limit"], "1");
}

#[tokio::test]
async fn exhausted_pager_errors_without_calling() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(200, report_page("R1", None)));

    let mut pager = service(&server)
        .new_reports_pager(ListReportsOptions::new("inst"))
        .unwrap();
    assert_eq!(pager.get_next().await.unwrap().len(), 1);
    let err = pager.get_next().await.unwrap_err();
    assert!(matches!(err, Error::Pagination(_)));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn pager_with_start_is_rejected_before_any_call() {
    let server = MockServer::start().await;
    let options = ListReportEvaluationsOptions {
        start: Some("abc".to_owned()),
        ..ListReportEvaluationsOptions::new("inst", "rep")
    };
    let err = service(&server)
        .new_report_evaluations_pager(options)
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn evaluations_pager_streams_items() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({
            "total_count": 3,
            "limit": 2,
            "report_id": "rep",
            "next": {"href": "/instances/inst/v3/reports/rep/evaluations?start=c2"},
            "evaluations": [
                {"assessment": {"assessment_id": "a1"}, "status": "pass"},
                {"assessment": {"assessment_id": "a2"}, "status": "failure"}
            ]
        }),
    ));
    server.enqueue(MockResponse::json(
        200,
        json!({
            "total_count": 3,
            "limit": 2,
            "evaluations": [{"status": "error"}]
        }),
    ));

    let options = ListReportEvaluationsOptions {
        status: Some(EvaluationStatus::Failure),
        ..ListReportEvaluationsOptions::new("inst", "rep")
    };
    let pager = service(&server)
        .new_report_evaluations_pager(options)
        .unwrap();
    let evaluations: Vec<_> = pager.into_stream().try_collect().await.unwrap();

    let statuses: Vec<_> = evaluations.iter().filter_map(|e| e.status.clone()).collect();
    assert_eq!(
        statuses,
        [EvaluationStatus::Pass, EvaluationStatus::Failure, EvaluationStatus::Error]
    );
    let requests = server.requests();
    assert_eq!(requests[0].path, "/instances/inst/v3/reports/rep/evaluations");
    assert_eq!(requests[0].query_params()["status"], "failure");
    assert_eq!(requests[1].query_params()["start"], "c2");
}

#[tokio::test]
async fn resources_pager_stops_on_empty_page() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({"total_count": 0, "limit": 50, "resources": []}),
    ));

    let mut pager = service(&server)
        .new_report_resources_pager(ListReportResourcesOptions::new("inst", "rep"))
        .unwrap();
    assert!(pager.get_all().await.unwrap().is_empty());
    assert!(!pager.has_next());
}

#[tokio::test]
async fn failed_page_can_be_retried() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(400, json!({"errors": [{"message": "bad"}]})));
    server.enqueue(MockResponse::json(200, report_page("R1", None)));

    let mut pager = service(&server)
        .new_reports_pager(ListReportsOptions::new("inst"))
        .unwrap();
    assert_eq!(pager.get_next().await.unwrap_err().status_code(), Some(400));
    assert!(pager.has_next());
    assert_eq!(pager.get_next().await.unwrap().len(), 1);
    assert!(!server.requests()[1].query_params().contains_key("start"));
}

#[tokio::test]
async fn server_errors_are_retried_when_enabled() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(500, json!({"error": "boom"})));
    server.enqueue(MockResponse::json(500, json!({"error": "boom"})));
    server.enqueue(MockResponse::json(200, json!({"id": "rep", "type": "ondemand"})));

    let mut service = service(&server);
    service.set_retry_policy(fast_retries(3));
    let response = service
        .get_report(&ReportOptions::new("inst", "rep"))
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    let report = response.result.unwrap();
    assert_eq!(report.id.as_deref(), Some("rep"));
    assert_eq!(report.report_type, Some(ReportType::OnDemand));
    assert_eq!(server.request_count(), 3);
}

#[tokio::test]
async fn server_error_fails_immediately_when_retries_disabled() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(500, json!({"error": "boom"})));
    server.enqueue(MockResponse::json(200, json!({"id": "rep"})));

    let err = service(&server)
        .get_report(&ReportOptions::new("inst", "rep"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.to_string(), "HTTP 500: boom");
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn evaluation_download_streams_csv() {
    let csv = "control_id,status\nc-1,pass\nc-2,failure\n";
    let server = MockServer::start().await;
    server.enqueue(MockResponse::raw(200, "application/csv", csv));

    let response = service(&server)
        .get_report_evaluation(&ReportOptions::new("inst", "rep"))
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.header("content-type"), Some("application/csv"));
    let body = response.result.unwrap().bytes().await.unwrap();
    assert_eq!(body.as_ref(), csv.as_bytes());

    let req = &server.requests()[0];
    assert_eq!(req.path, "/instances/inst/v3/reports/rep/download");
    assert_eq!(req.header("accept"), Some("application/csv"));
}

#[tokio::test]
async fn empty_path_parameter_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    let service = service(&server);

    let err = service
        .get_report(&ReportOptions::new("inst", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = service
        .get_report_rule(&GetReportRuleOptions::new("inst", "rep", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn cancellation_during_backoff_stops_retrying() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(503, json!({"error": "busy"})));

    let mut service = service(&server);
    service.set_retry_policy(
        RetryPolicy::enabled(4, Duration::from_secs(30))
            .with_base_interval(Duration::from_secs(10)),
    );
    let ctx = CallContext::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = service
        .get_report_summary_with_context(&ctx, &ReportOptions::new("inst", "rep"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn deadline_bounds_a_slow_response() {
    let server = MockServer::start().await;
    server.enqueue(
        MockResponse::json(200, json!({"report_id": "rep"})).with_delay(Duration::from_secs(5)),
    );

    let ctx = CallContext::background().with_timeout(Duration::from_millis(100));
    let err = service(&server)
        .get_report_summary_with_context(&ctx, &ReportOptions::new("inst", "rep"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::DeadlineExceeded)));
}

#[tokio::test]
async fn latest_reports_sends_filters_and_correlation_id() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({
            "home_account_id": "acct",
            "controls_summary": {"status": "compliant", "total_count": 10},
            "reports": [{"id": "R9", "profile": {"name": "CIS"}}]
        }),
    ));

    let options = GetLatestReportsOptions {
        home_account_id: Some("acct".to_owned()),
        sort: Some("profile_name".to_owned()),
        ..GetLatestReportsOptions::new("inst")
    }
    .with_x_correlation_id("corr-7");
    let response = service(&server).get_latest_reports(&options).await.unwrap();
    let latest = response.result.unwrap();
    assert_eq!(latest.reports.len(), 1);
    assert_eq!(latest.home_account_id.as_deref(), Some("acct"));

    let req = &server.requests()[0];
    assert_eq!(req.path, "/instances/inst/v3/reports/latest");
    assert_eq!(req.query_params()["home_account_id"], "acct");
    assert_eq!(req.query_params()["sort"], "profile_name");
    assert_eq!(req.header("x-correlation-id"), Some("corr-7"));
    let analytics = req.header("x-ibmcloud-sdk-analytics").unwrap();
    assert!(analytics.contains("service_name=results_reports_api"));
    assert!(analytics.contains("operation_id=GetLatestReports"));
}

#[tokio::test]
async fn controls_query_is_encoded() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(200, json!({"controls": []})));

    let options = GetReportControlsOptions {
        control_name: Some("access & identity".to_owned()),
        status: Some(AggregatedStatus::NotCompliant),
        ..GetReportControlsOptions::new("inst", "rep")
    };
    service(&server).get_report_controls(&options).await.unwrap();

    let req = &server.requests()[0];
    assert_eq!(req.path, "/instances/inst/v3/reports/rep/controls");
    let query = req.query_params();
    assert_eq!(query["control_name"], "access & identity");
    assert_eq!(query["status"], "not_compliant");
    assert!(!query.contains_key("sort"));
}

#[tokio::test]
async fn tags_use_the_bare_v3_path() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({"report_id": "rep", "tags": {"user": ["env:prod"], "service": []}}),
    ));

    let response = service(&server)
        .get_report_tags(&GetReportTagsOptions::new("rep"))
        .await
        .unwrap();
    let tags = response.result.unwrap().tags.unwrap();
    assert_eq!(tags.user, ["env:prod"]);
    assert_eq!(server.requests()[0].path, "/v3/reports/rep/tags");
}

#[tokio::test]
async fn violations_drift_sends_window() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({
            "report_id": "rep",
            "scan_time_duration": 7,
            "data_points": [{"report_id": "old", "scan_time": "2024-01-02T03:04:05Z"}]
        }),
    ));

    let options = GetReportViolationsDriftOptions {
        scan_time_duration: Some(7),
        ..GetReportViolationsDriftOptions::new("inst", "rep")
    };
    let drift = service(&server)
        .get_report_violations_drift(&options)
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(drift.scan_time_duration, Some(7));
    assert_eq!(drift.data_points[0].report_id.as_deref(), Some("old"));

    let req = &server.requests()[0];
    assert_eq!(req.path, "/instances/inst/v3/reports/rep/violations_drift");
    assert_eq!(req.query_params()["scan_time_duration"], "7");
}

#[tokio::test]
async fn report_rule_decodes() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({"id": "rule-1", "type": "system_defined", "version": "1.0.0"}),
    ));

    let rule = service(&server)
        .get_report_rule(&GetReportRuleOptions::new("inst", "rep", "rule-1"))
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(rule.id.as_deref(), Some("rule-1"));
    assert_eq!(
        server.requests()[0].path,
        "/instances/inst/v3/reports/rep/rules/rule-1"
    );
}

#[tokio::test]
async fn profiles_and_scopes_use_instance_paths() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({"profiles": [{"id": "p1", "name": "CIS", "version": "1.0"}]}),
    ));
    server.enqueue(MockResponse::json(
        200,
        json!({"scopes": [{"id": "s1", "type": "account"}]}),
    ));
    let service = service(&server);

    let options = GetReportsProfilesOptions {
        report_id: Some("rep".to_owned()),
        ..GetReportsProfilesOptions::new("inst")
    };
    let profiles = service
        .get_reports_profiles(&options)
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(profiles.profiles[0].name.as_deref(), Some("CIS"));

    let scopes = service
        .get_reports_scopes(&GetReportsScopesOptions::new("inst"))
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(scopes.scopes[0].scope_type.as_deref(), Some("account"));

    let requests = server.requests();
    assert_eq!(requests[0].path, "/instances/inst/v3/reports/profiles");
    assert_eq!(requests[0].query_params()["report_id"], "rep");
    assert_eq!(requests[1].path, "/instances/inst/v3/reports/scopes");
    assert!(requests[1].query.is_none());
}

#[tokio::test]
async fn null_fields_in_responses_decode() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({
            "id": "rep",
            "type": null,
            "scan_time": null,
            "profile": null,
            "attachment": {"id": "att", "scope": null}
        }),
    ));
    server.enqueue(MockResponse::json(
        200,
        json!({"id": "rule-1", "labels": null, "target": null}),
    ));
    server.enqueue(MockResponse::json(
        200,
        json!({"report_id": "rep", "scan_time_duration": null, "data_points": null}),
    ));
    let service = service(&server);

    let report = service
        .get_report(&ReportOptions::new("inst", "rep"))
        .await
        .unwrap()
        .result
        .unwrap();
    assert!(report.report_type.is_none());
    assert!(report.profile.is_none());
    assert!(report.attachment.unwrap().scope.is_empty());

    let rule = service
        .get_report_rule(&GetReportRuleOptions::new("inst", "rep", "rule-1"))
        .await
        .unwrap()
        .result
        .unwrap();
    assert!(rule.labels.is_empty());

    let drift = service
        .get_report_violations_drift(&GetReportViolationsDriftOptions::new("inst", "rep"))
        .await
        .unwrap()
        .result
        .unwrap();
    assert!(drift.scan_time_duration.is_none());
    assert!(drift.data_points.is_empty());
}
