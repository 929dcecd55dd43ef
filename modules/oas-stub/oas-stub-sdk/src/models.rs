use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stub definitions
// ---------------------------------------------------------------------------

/// Everything registered for one application: the specification text plus
/// context-wide and per-path overrides.
///
/// Values are replaced as a whole on update, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinitions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    /// Path template (as declared in the specification) to override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configurations: Option<BTreeMap<String, ApiConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<ApiHeaders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ApiOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ApiData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<ApiDelay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginDefinition>,
}

impl ApiDefinitions {
    #[must_use]
    pub fn with_specification(mut self, specification: impl Into<String>) -> Self {
        self.specification = Some(specification.into());
        self
    }

    #[must_use]
    pub fn with_configuration(mut self, path: impl Into<String>, config: ApiConfiguration) -> Self {
        self.configurations
            .get_or_insert_with(BTreeMap::new)
            .insert(path.into(), config);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ApiOptions) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: ApiDelay) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: ApiHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: ApiData) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_plugin(mut self, plugin: PluginDefinition) -> Self {
        self.plugin = Some(plugin);
        self
    }
}

/// Per-path override. `methods` narrows it further to one HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<ApiHeaders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ApiOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ApiData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<ApiDelay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginDefinition>,
    /// Upper-case HTTP method to override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<BTreeMap<String, ApiMethodConfiguration>>,
}

impl ApiConfiguration {
    #[must_use]
    pub fn with_options(mut self, options: ApiOptions) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: ApiDelay) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: ApiHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: ApiData) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_plugin(mut self, plugin: PluginDefinition) -> Self {
        self.plugin = Some(plugin);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>, config: ApiMethodConfiguration) -> Self {
        self.methods
            .get_or_insert_with(BTreeMap::new)
            .insert(method.into().to_ascii_uppercase(), config);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMethodConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<ApiHeaders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ApiOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ApiData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<ApiDelay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginDefinition>,
}

// ---------------------------------------------------------------------------
// Overridable properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_validate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_monitor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_record: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<ApiLatency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ApiFailure>,
}

impl ApiOptions {
    #[must_use]
    pub fn with_failure(mut self, failure: ApiFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    #[must_use]
    pub fn with_should_validate(mut self, value: bool) -> Self {
        self.should_validate = Some(value);
        self
    }

    #[must_use]
    pub fn with_should_monitor(mut self, value: bool) -> Self {
        self.should_monitor = Some(value);
        self
    }

    #[must_use]
    pub fn with_should_record(mut self, value: bool) -> Self {
        self.should_record = Some(value);
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: ApiLatency) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Injected failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ApiFailure {
    None,
    /// Emit a status outside the HTTP range so the transport drops the connection.
    ProtocolError,
    HttpStatus {
        status: u16,
    },
    /// Abort without emitting any response.
    ConnectionReset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

impl DelayUnit {
    #[must_use]
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            DelayUnit::Nanoseconds => Duration::from_nanos(amount),
            DelayUnit::Microseconds => Duration::from_micros(amount),
            DelayUnit::Milliseconds => Duration::from_millis(amount),
            DelayUnit::Seconds => Duration::from_secs(amount),
            DelayUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ApiDelay {
    #[serde(rename_all = "camelCase")]
    Fixed {
        fixed_delay: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay_unit: Option<DelayUnit>,
    },
}

impl ApiDelay {
    #[must_use]
    pub fn fixed_millis(millis: u64) -> Self {
        ApiDelay::Fixed {
            fixed_delay: millis,
            delay_unit: None,
        }
    }

    /// Target duration of the delay.
    #[must_use]
    pub fn target(&self) -> Duration {
        match self {
            ApiDelay::Fixed {
                fixed_delay,
                delay_unit,
            } => delay_unit.unwrap_or_default().to_duration(*fixed_delay),
        }
    }
}

/// Pause between emitted response bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLatency {
    pub interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<DelayUnit>,
}

impl ApiLatency {
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.unit.unwrap_or_default().to_duration(self.interval)
    }
}

/// Static headers added to requests (before validation) and responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHeaders {
    #[serde(default)]
    pub request: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub response: BTreeMap<String, Vec<String>>,
}

/// Free-form data handed to plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiData(pub serde_json::Map<String, serde_json::Value>);

impl ApiData {
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&serde_json::Value> {
        self.0.get(label)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ApiData {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Plugin source. Compared by value, so equal scripts share one compiled form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginDefinition {
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub script: String,
}

impl PluginDefinition {
    #[must_use]
    pub fn new(plugin_type: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            plugin_type: plugin_type.into(),
            script: script.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Monitoring
// ---------------------------------------------------------------------------

/// One observed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiMetric {
    pub request_timestamp: DateTime<Utc>,
    pub execution_time: Duration,
    pub api_path: String,
    pub http_method: String,
    pub http_status: u16,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequestRecord {
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub cookies: BTreeMap<String, String>,
    pub body: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponseRecord {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Option<Bytes>,
}

/// Request/response pair captured when `shouldRecord` is on.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRecord {
    pub method: String,
    pub path: String,
    pub request: ApiRequestRecord,
    pub response: ApiResponseRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_deserialize_from_camel_case() {
        let defs: ApiDefinitions = serde_json::from_value(serde_json::json!({
            "specification": "openapi: 3.0.3",
            "options": {"shouldValidate": false},
            "delay": {"type": "fixed", "fixedDelay": 2, "delayUnit": "seconds"},
            "configurations": {
                "/v1/pets/{id}": {
                    "options": {"failure": {"type": "http-status", "status": 404}},
                    "methods": {"GET": {"plugin": {"type": "rhai", "script": "()"}}}
                }
            }
        }))
        .unwrap();

        assert_eq!(defs.options.unwrap().should_validate, Some(false));
        assert_eq!(defs.delay.unwrap().target(), Duration::from_secs(2));
        let config = &defs.configurations.unwrap()["/v1/pets/{id}"];
        assert_eq!(
            config.options.as_ref().unwrap().failure,
            Some(ApiFailure::HttpStatus { status: 404 })
        );
        let get = &config.methods.as_ref().unwrap()["GET"];
        assert_eq!(get.plugin.as_ref().unwrap().plugin_type, "rhai");
    }

    #[test]
    fn failure_modes_use_kebab_case_tags() {
        let protocol: ApiFailure =
            serde_json::from_value(serde_json::json!({"type": "protocol-error"})).unwrap();
        let reset: ApiFailure =
            serde_json::from_value(serde_json::json!({"type": "connection-reset"})).unwrap();
        assert_eq!(protocol, ApiFailure::ProtocolError);
        assert_eq!(reset, ApiFailure::ConnectionReset);
    }

    #[test]
    fn delay_unit_defaults_to_milliseconds() {
        assert_eq!(ApiDelay::fixed_millis(500).target(), Duration::from_millis(500));
        let latency = ApiLatency {
            interval: 3,
            unit: None,
        };
        assert_eq!(latency.interval(), Duration::from_millis(3));
    }

    #[test]
    fn unknown_failure_type_is_rejected() {
        let result: Result<ApiFailure, _> =
            serde_json::from_value(serde_json::json!({"type": "explode"}));
        assert!(result.is_err());
    }
}
