use std::sync::Arc;
use std::time::Duration;

use scc_admin::{
    AdminService, AdminServiceOptions, GetSettingsOptions, JsonPatchOperation,
    PostTestEventOptions, UpdateSettingsOptions,
};
use scc_core::{
    BasicAuthenticator, CallContext, Error, Headers, NoAuthAuthenticator, TransportError,
};
use scc_mock_server::{MockResponse, MockServer};
use serde_json::json;

fn service(server: &MockServer) -> AdminService {
    AdminService::new(
        AdminServiceOptions::new(Arc::new(NoAuthAuthenticator)).with_url(server.url()),
    )
    .unwrap()
}

#[tokio::test]
async fn get_settings_with_empty_body_has_no_result() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::empty(200));

    let response = service(&server)
        .get_settings(&GetSettingsOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert!(response.result.is_none());

    let req = &server.requests()[0];
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/settings");
    assert_eq!(req.header("accept"), Some("application/json"));
    let analytics = req.header("x-ibmcloud-sdk-analytics").unwrap();
    assert!(analytics.contains("service_name=admin_service_api"));
    assert!(analytics.contains("operation_id=GetSettings"));
    assert!(req.header("user-agent").unwrap().starts_with("scc-rust-sdk/"));
}

#[tokio::test]
async fn update_settings_sends_json_patch() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        200,
        json!({
            "event_notifications": {
                "instance_crn": "crn:v1:bluemix:public:event-notifications:us-south:a/1::",
                "source_id": "crn:v1:source",
                "source_name": "scc"
            },
            "object_storage": {
                "instance_crn": "crn:v1:bluemix:public:cloud-object-storage:global:a/1::",
                "bucket": "scc-bucket",
                "bucket_location": "us-south",
                "bucket_endpoint": "https://s3.us-south.cloud-object-storage.appdomain.cloud"
            }
        }),
    ));

    let options =
        UpdateSettingsOptions::new(vec![JsonPatchOperation::add("/x", json!("y"))]);
    let response = service(&server).update_settings(&options).await.unwrap();

    let req = &server.requests()[0];
    assert_eq!(req.method, "PATCH");
    assert_eq!(req.path, "/settings");
    assert_eq!(req.header("content-type"), Some("application/json-patch+json"));
    assert_eq!(req.json(), json!([{"op": "add", "path": "/x", "value": "y"}]));

    let settings = response.result.unwrap();
    assert_eq!(
        settings.object_storage.unwrap().bucket.as_deref(),
        Some("scc-bucket")
    );
    assert_eq!(
        settings.event_notifications.unwrap().source_name.as_deref(),
        Some("scc")
    );
}

#[tokio::test]
async fn update_settings_validates_before_sending() {
    let server = MockServer::start().await;
    let options = UpdateSettingsOptions::new(vec![JsonPatchOperation::remove("")]);
    let err = service(&server).update_settings(&options).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::raw(200, "application/json", "} not json {"));

    let err = service(&server)
        .get_settings(&GetSettingsOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(err.response().unwrap().status_code, 200);
}

#[tokio::test]
async fn post_test_event_decodes_result() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(202, json!({"success": true})));

    let response = service(&server)
        .post_test_event(&PostTestEventOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status_code, 202);
    assert!(response.result.unwrap().success);

    let req = &server.requests()[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/test_event");
    assert!(req.body.is_empty());
}

#[tokio::test]
async fn correlation_id_and_custom_headers_are_sent() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::empty(200).with_header("X-Correlation-Id", "corr-42"));

    let options = GetSettingsOptions::new()
        .with_x_correlation_id("corr-42")
        .with_headers(Headers::new().with("X-Request-Source", "tests"));
    let response = service(&server).get_settings(&options).await.unwrap();
    assert_eq!(response.header("x-correlation-id"), Some("corr-42"));

    let req = &server.requests()[0];
    assert_eq!(req.header("x-correlation-id"), Some("corr-42"));
    assert_eq!(req.header("x-request-source"), Some("tests"));
}

#[tokio::test]
async fn error_status_is_surfaced_with_body() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(
        403,
        json!({"errors": [{"code": "forbidden", "message": "not allowed"}], "status_code": 403}),
    ));

    let err = service(&server)
        .post_test_event(&PostTestEventOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(err.to_string(), "HTTP 403: not allowed");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn authenticator_is_applied() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::empty(200));

    let service = AdminService::new(
        AdminServiceOptions::new(Arc::new(BasicAuthenticator::new("admin", "secret").unwrap()))
            .with_url(server.url()),
    )
    .unwrap();
    service.get_settings(&GetSettingsOptions::new()).await.unwrap();
    assert_eq!(
        server.requests()[0].header("authorization"),
        Some("Basic YWRtaW46c2VjcmV0")
    );
}

#[tokio::test]
async fn clone_shares_authenticator_but_not_configuration() {
    let server = MockServer::start().await;
    let original = service(&server);
    let mut copy = original.clone();

    assert_eq!(copy.service_url(), original.service_url());
    assert!(Arc::ptr_eq(copy.authenticator(), original.authenticator()));

    copy.set_service_url("https://elsewhere.example.com").unwrap();
    copy.enable_retries(2, Duration::from_secs(1));
    assert_eq!(original.service_url(), server.url());
    assert!(!original.retry_policy().enabled);
}

#[tokio::test]
async fn cancelled_context_sends_nothing() {
    let server = MockServer::start().await;
    let mut service = service(&server);
    service.enable_retries(4, Duration::from_millis(10));

    let ctx = CallContext::background();
    ctx.cancel();
    let err = service
        .get_settings_with_context(&ctx, &GetSettingsOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn empty_service_url_is_url_missing() {
    let service = AdminService::new(
        AdminServiceOptions::new(Arc::new(NoAuthAuthenticator)).with_url(""),
    )
    .unwrap();
    let err = service
        .get_settings(&GetSettingsOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UrlMissing));
}

#[tokio::test]
async fn gzip_compresses_patch_body() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::empty(200));
    let mut service = service(&server);
    service.set_enable_gzip_compression(true);

    let options =
        UpdateSettingsOptions::new(vec![JsonPatchOperation::replace("/a", json!(1))]);
    service.update_settings(&options).await.unwrap();

    let req = &server.requests()[0];
    assert_eq!(req.header("content-encoding"), Some("gzip"));
    assert_eq!(&req.body[..2], &[0x1f, 0x8b]);
}
