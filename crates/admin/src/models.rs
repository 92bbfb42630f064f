use chrono::{DateTime, Utc};
use scc_core::{Error, Headers};
use serde::{Deserialize, Serialize};

/// Instance settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_notifications: Option<EventNotifications>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_storage: Option<ObjectStorage>,
}

/// The Event Notifications instance that receives SCC findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventNotifications {
    /// CRN of the Event Notifications instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_crn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
    /// Source id registered in Event Notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

/// The Cloud Object Storage bucket where results are archived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectStorage {
    /// CRN of the Cloud Object Storage instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_crn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
}

/// RFC 6902 operation name.
///
/// Unknown values are rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonPatchOp {
    Add,
    Copy,
    Move,
    Remove,
    Replace,
    Test,
}

impl JsonPatchOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Test => "test",
        }
    }
}

/// One RFC 6902 JSON patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPatchOperation {
    pub op: JsonPatchOp,
    /// JSON pointer to the target location.
    pub path: String,
    /// Source pointer for `copy` and `move`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl JsonPatchOperation {
    pub fn new(op: JsonPatchOp, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            from: None,
            value: None,
        }
    }

    /// An `add` operation.
    pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(JsonPatchOp::Add, path).with_value(value)
    }

    /// A `replace` operation.
    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(JsonPatchOp::Replace, path).with_value(value)
    }

    /// A `remove` operation.
    pub fn remove(path: impl Into<String>) -> Self {
        Self::new(JsonPatchOp::Remove, path)
    }

    #[must_use]
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if self.path.is_empty() {
            return Err(Error::validation("JSON patch path must not be empty"));
        }
        if matches!(self.op, JsonPatchOp::Copy | JsonPatchOp::Move) && self.from.is_none() {
            return Err(Error::validation(format!(
                "JSON patch '{}' operation requires 'from'",
                self.op.as_str()
            )));
        }
        Ok(())
    }
}

/// Outcome of a test event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEvent {
    /// Whether the event was delivered to Event Notifications.
    pub success: bool,
}

/// Options for `get_settings`.
#[derive(Debug, Clone, Default)]
pub struct GetSettingsOptions {
    pub x_correlation_id: Option<String>,
    /// Extra request headers.
    pub headers: Headers,
}

impl GetSettingsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_x_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.x_correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}

/// Options for `update_settings`.
#[derive(Debug, Clone)]
pub struct UpdateSettingsOptions {
    /// The patch document.
    pub json_patch: Vec<JsonPatchOperation>,
    pub x_correlation_id: Option<String>,
    /// Extra request headers.
    pub headers: Headers,
}

impl UpdateSettingsOptions {
    pub fn new(json_patch: Vec<JsonPatchOperation>) -> Self {
        Self {
            json_patch,
            x_correlation_id: None,
            headers: Headers::new(),
        }
    }

    #[must_use]
    pub fn with_x_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.x_correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.json_patch
            .iter()
            .try_for_each(JsonPatchOperation::validate)
    }
}

/// Options for `post_test_event`.
#[derive(Debug, Clone, Default)]
pub struct PostTestEventOptions {
    pub x_correlation_id: Option<String>,
    /// Extra request headers.
    pub headers: Headers,
}

impl PostTestEventOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_x_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.x_correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}
