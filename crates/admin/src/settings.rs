use std::collections::HashMap;

use scc_core::{
    CONTENT_TYPE_JSON_PATCH, CallContext, DetailedResponse, Error, Method,
    sdk_headers,
};
use tracing::debug;

use crate::models::{
    GetSettingsOptions, PostTestEventOptions, Settings, TestEvent, UpdateSettingsOptions,
};
use crate::{AdminService, DEFAULT_SERVICE_NAME, SERVICE_VERSION};

impl AdminService {
    /// Retrieve the instance settings.
    pub async fn get_settings(
        &self,
        options: &GetSettingsOptions,
    ) -> Result<DetailedResponse<Settings>, Error> {
        self.get_settings_with_context(&CallContext::background(), options)
            .await
    }

    /// [`AdminService::get_settings`] under an explicit cancellation scope.
    pub async fn get_settings_with_context(
        &self,
        ctx: &CallContext,
        options: &GetSettingsOptions,
    ) -> Result<DetailedResponse<Settings>, Error> {
        let mut builder = self.request_builder(Method::Get, "/settings", &HashMap::new(), ctx)?;
        builder
            .add_headers(&sdk_headers(DEFAULT_SERVICE_NAME, SERVICE_VERSION, "GetSettings"))
            .add_call_headers(options.x_correlation_id.as_deref(), &options.headers);
        self.execute("get_settings", builder.build()?).await
    }

    /// Apply a JSON patch to the instance settings.
    ///
    /// Returns the settings as they are after the update.
    pub async fn update_settings(
        &self,
        options: &UpdateSettingsOptions,
    ) -> Result<DetailedResponse<Settings>, Error> {
        self.update_settings_with_context(&CallContext::background(), options)
            .await
    }

    /// [`AdminService::update_settings`] under an explicit cancellation scope.
    pub async fn update_settings_with_context(
        &self,
        ctx: &CallContext,
        options: &UpdateSettingsOptions,
    ) -> Result<DetailedResponse<Settings>, Error> {
        options.validate()?;
        debug!(operations = options.json_patch.len(), "updating settings");

        let mut builder = self.request_builder(Method::Patch, "/settings", &HashMap::new(), ctx)?;
        builder
            .add_headers(&sdk_headers(DEFAULT_SERVICE_NAME, SERVICE_VERSION, "UpdateSettings"))
            .add_call_headers(options.x_correlation_id.as_deref(), &options.headers)
            .set_json_body(&options.json_patch, CONTENT_TYPE_JSON_PATCH)?;
        self.execute("update_settings", builder.build()?).await
    }

    /// Ask the service to send a test event to the configured Event
    /// Notifications instance.
    pub async fn post_test_event(
        &self,
        options: &PostTestEventOptions,
    ) -> Result<DetailedResponse<TestEvent>, Error> {
        self.post_test_event_with_context(&CallContext::background(), options)
            .await
    }

    /// [`AdminService::post_test_event`] under an explicit cancellation scope.
    pub async fn post_test_event_with_context(
        &self,
        ctx: &CallContext,
        options: &PostTestEventOptions,
    ) -> Result<DetailedResponse<TestEvent>, Error> {
        let mut builder = self.request_builder(Method::Post, "/test_event", &HashMap::new(), ctx)?;
        builder
            .add_headers(&sdk_headers(DEFAULT_SERVICE_NAME, SERVICE_VERSION, "PostTestEvent"))
            .add_call_headers(options.x_correlation_id.as_deref(), &options.headers);
        self.execute("post_test_event", builder.build()?).await
    }
}
