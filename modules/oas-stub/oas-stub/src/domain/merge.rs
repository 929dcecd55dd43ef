use oas_stub_sdk::{
    ApiData, ApiDefinitions, ApiDelay, ApiFailure, ApiHeaders, ApiLatency, ApiOptions,
    PluginDefinition,
};

use crate::domain::path::find_matching_path;

/// Combine an override with the value it overrides.
pub trait Merge: Sized {
    /// `self` is the override and wins wherever it says something.
    #[must_use]
    fn merge_over(self, base: Self) -> Self;
}

/// An absent override yields `base`; a present one wins.
#[must_use]
pub fn merge<T: Merge>(override_value: Option<T>, base: Option<T>) -> Option<T> {
    match (override_value, base) {
        (Some(o), Some(b)) => Some(o.merge_over(b)),
        (o, b) => o.or(b),
    }
}

impl Merge for ApiOptions {
    fn merge_over(self, base: Self) -> Self {
        Self {
            should_validate: self.should_validate.or(base.should_validate),
            should_monitor: self.should_monitor.or(base.should_monitor),
            should_record: self.should_record.or(base.should_record),
            latency: self.latency.or(base.latency),
            failure: self.failure.or(base.failure),
        }
    }
}

impl Merge for ApiHeaders {
    fn merge_over(self, base: Self) -> Self {
        let mut merged = base;
        merged.request.extend(self.request);
        merged.response.extend(self.response);
        merged
    }
}

impl Merge for ApiData {
    fn merge_over(self, base: Self) -> Self {
        let mut merged = base;
        merged.0.extend(self.0);
        merged
    }
}

impl Merge for ApiDelay {
    fn merge_over(self, _base: Self) -> Self {
        self
    }
}

impl Merge for PluginDefinition {
    fn merge_over(self, _base: Self) -> Self {
        self
    }
}

/// Overrides in force for one request: method over path over context-wide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    pub headers: Option<ApiHeaders>,
    pub options: Option<ApiOptions>,
    pub delay: Option<ApiDelay>,
    pub data: Option<ApiData>,
    pub plugin: Option<PluginDefinition>,
}

macro_rules! merged_property {
    ($defs:expr, $path:expr, $method:expr, $field:ident) => {
        merge(
            merge(
                $method.and_then(|c| c.$field.clone()),
                $path.and_then(|c| c.$field.clone()),
            ),
            $defs.$field.clone(),
        )
    };
}

impl EffectiveConfig {
    /// Resolve against the configuration key matching `api_path` and the
    /// method entry under it.
    #[must_use]
    pub fn resolve(definitions: &ApiDefinitions, api_path: &str, method: &str) -> Self {
        let path_config = definitions.configurations.as_ref().and_then(|configs| {
            find_matching_path(api_path, configs.keys().map(String::as_str))
                .and_then(|key| configs.get(key))
        });
        let method_config = path_config
            .and_then(|c| c.methods.as_ref())
            .and_then(|methods| {
                methods
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(method))
                    .map(|(_, config)| config)
            });

        Self {
            headers: merged_property!(definitions, path_config, method_config, headers),
            options: merged_property!(definitions, path_config, method_config, options),
            delay: merged_property!(definitions, path_config, method_config, delay),
            data: merged_property!(definitions, path_config, method_config, data),
            plugin: merged_property!(definitions, path_config, method_config, plugin),
        }
    }

    /// Validation is on unless switched off.
    #[must_use]
    pub fn should_validate(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|o| o.should_validate)
            .unwrap_or(true)
    }

    #[must_use]
    pub fn should_monitor(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|o| o.should_monitor)
            .unwrap_or(true)
    }

    #[must_use]
    pub fn should_record(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|o| o.should_record)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn failure(&self) -> ApiFailure {
        self.options
            .as_ref()
            .and_then(|o| o.failure)
            .unwrap_or(ApiFailure::None)
    }

    #[must_use]
    pub fn latency(&self) -> Option<ApiLatency> {
        self.options.as_ref().and_then(|o| o.latency)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use oas_stub_sdk::{ApiConfiguration, ApiMethodConfiguration};
    use serde_json::json;

    use super::*;

    fn headers(request: &[(&str, &str)], response: &[(&str, &str)]) -> ApiHeaders {
        let map = |pairs: &[(&str, &str)]| -> BTreeMap<String, Vec<String>> {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), vec![(*v).to_owned()]))
                .collect()
        };
        ApiHeaders {
            request: map(request),
            response: map(response),
        }
    }

    #[test]
    fn absent_override_is_identity() {
        let base = ApiDelay::fixed_millis(10);
        assert_eq!(merge(None, Some(base)), Some(base));
        assert_eq!(merge(Some(ApiDelay::fixed_millis(5)), Some(base)), Some(ApiDelay::fixed_millis(5)));
        assert_eq!(merge::<ApiDelay>(None, None), None);
    }

    #[test]
    fn options_merge_field_by_field() {
        let base = ApiOptions::default()
            .with_should_validate(false)
            .with_should_record(true);
        let over = ApiOptions::default().with_should_validate(true);
        let merged = over.merge_over(base);
        assert_eq!(merged.should_validate, Some(true));
        assert_eq!(merged.should_record, Some(true));
        assert_eq!(merged.failure, None);
    }

    #[test]
    fn headers_and_data_union_with_override_winning() {
        let merged = headers(&[("a", "1")], &[("x", "over")])
            .merge_over(headers(&[("b", "2")], &[("x", "base")]));
        assert_eq!(merged.request.len(), 2);
        assert_eq!(merged.response["x"], vec!["over".to_owned()]);

        let data = ApiData::from(json!({"a": 1, "b": 1}).as_object().unwrap().clone())
            .merge_over(ApiData::from(json!({"b": 2, "c": 2}).as_object().unwrap().clone()));
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({"b": 1, "c": 2, "a": 1}));
    }

    #[test]
    fn method_beats_path_beats_context() {
        let definitions = ApiDefinitions::default()
            .with_options(ApiOptions::default().with_should_monitor(false))
            .with_delay(ApiDelay::fixed_millis(1))
            .with_configuration(
                "/v1/pets/{id}",
                ApiConfiguration::default()
                    .with_delay(ApiDelay::fixed_millis(2))
                    .with_options(ApiOptions::default().with_failure(ApiFailure::ProtocolError))
                    .with_method(
                        "get",
                        ApiMethodConfiguration {
                            delay: Some(ApiDelay::fixed_millis(3)),
                            ..ApiMethodConfiguration::default()
                        },
                    ),
            );

        let get = EffectiveConfig::resolve(&definitions, "/v1/pets/1", "GET");
        assert_eq!(get.delay, Some(ApiDelay::fixed_millis(3)));
        assert_eq!(get.failure(), ApiFailure::ProtocolError);
        assert!(!get.should_monitor());
        assert!(get.should_validate());

        let put = EffectiveConfig::resolve(&definitions, "/v1/pets/1", "PUT");
        assert_eq!(put.delay, Some(ApiDelay::fixed_millis(2)));

        let other = EffectiveConfig::resolve(&definitions, "/v1/owners", "GET");
        assert_eq!(other.delay, Some(ApiDelay::fixed_millis(1)));
        assert_eq!(other.failure(), ApiFailure::None);
    }
}
