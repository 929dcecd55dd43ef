use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::PluginError;
use crate::storage::SessionStorage;

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// Inbound request as seen by validators and plugins.
///
/// Header names are stored lower-case; lookups through [`RequestContext::header`]
/// are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub application_name: String,
    pub api_path: String,
    pub method: String,
    pub content: Option<Bytes>,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub cookies: BTreeMap<String, String>,
    /// A key without `=` maps to `None`.
    pub query_parameters: BTreeMap<String, Vec<Option<String>>>,
}

impl RequestContext {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.header(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<&[Option<String>]> {
        self.query_parameters.get(name).map(Vec::as_slice)
    }

    /// Body as UTF-8 text, when present and valid.
    #[must_use]
    pub fn content_as_str(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

// ---------------------------------------------------------------------------
// Response context
// ---------------------------------------------------------------------------

/// Response produced by synthesis and optionally replaced by a plugin.
///
/// `status` is a plain integer: failure injection uses values outside the
/// HTTP range.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseContext {
    pub status: u16,
    pub content: Option<Bytes>,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ResponseContext {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content: None,
            content_type: None,
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn content_as_str(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

// ---------------------------------------------------------------------------
// Plugin API
// ---------------------------------------------------------------------------

/// Everything a plugin may read while customizing one response.
pub struct PluginContext {
    request: RequestContext,
    response: ResponseContext,
    data: serde_json::Map<String, serde_json::Value>,
    session: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PluginContext {
    #[must_use]
    pub fn new(
        request: RequestContext,
        response: ResponseContext,
        data: serde_json::Map<String, serde_json::Value>,
        session: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            request,
            response,
            data,
            session,
        }
    }

    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Response as it stood before the plugin ran.
    #[must_use]
    pub fn response(&self) -> &ResponseContext {
        &self.response
    }

    #[must_use]
    pub fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }

    #[must_use]
    pub fn api_data(&self, label: &str) -> Option<&serde_json::Value> {
        self.data.get(label)
    }

    /// Deserialize one entry of the data bag.
    ///
    /// # Errors
    /// Returns `PluginError::Runtime` if the entry is missing or has the wrong shape.
    pub fn api_data_as<T: DeserializeOwned>(&self, label: &str) -> Result<T, PluginError> {
        let value = self
            .data
            .get(label)
            .cloned()
            .ok_or_else(|| PluginError::Runtime(format!("no api data labelled '{label}'")))?;
        serde_json::from_value(value).map_err(|e| PluginError::Runtime(e.to_string()))
    }

    #[must_use]
    pub fn session_storage(&self) -> Arc<dyn SessionStorage> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn into_response(self) -> ResponseContext {
        self.response
    }
}

/// One runtime instance of a compiled plugin. Instances are never reused
/// across requests.
#[async_trait::async_trait]
pub trait ApiPlugin: Send + Sync {
    /// Return the response to emit.
    ///
    /// # Errors
    /// Any error leaves the pre-plugin response in place.
    async fn customize(&self, ctx: PluginContext) -> Result<ResponseContext, PluginError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct MapStorage(Mutex<BTreeMap<String, serde_json::Value>>);

    impl SessionStorage for MapStorage {
        fn put(&self, key: &str, value: serde_json::Value, _ttl: Duration) {
            self.0.lock().unwrap().insert(key.to_string(), value);
        }

        fn get(&self, key: &str) -> Option<serde_json::Value> {
            self.0.lock().unwrap().get(key).cloned()
        }

        fn delete(&self, key: &str) -> Option<serde_json::Value> {
            self.0.lock().unwrap().remove(key)
        }
    }

    struct CountingPlugin;

    #[async_trait::async_trait]
    impl ApiPlugin for CountingPlugin {
        async fn customize(&self, ctx: PluginContext) -> Result<ResponseContext, PluginError> {
            let storage = ctx.session_storage();
            let hits = storage.get("hits").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
            storage.put("hits", hits.into(), Duration::ZERO);
            Ok(ctx
                .into_response()
                .with_header("x-hits", hits.to_string()))
        }
    }

    fn context(storage: Arc<dyn SessionStorage>) -> PluginContext {
        let mut data = serde_json::Map::new();
        data.insert("limit".into(), serde_json::json!(5));
        PluginContext::new(
            RequestContext::default(),
            ResponseContext::new(200).with_content("{}"),
            data,
            storage,
        )
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut request = RequestContext::default();
        request
            .headers
            .insert("x-request-id".into(), vec!["abc".into()]);
        assert_eq!(request.first_header("X-Request-ID"), Some("abc"));
        assert!(request.header("x-missing").is_none());
    }

    #[test]
    fn api_data_as_reports_missing_label() {
        let ctx = context(Arc::new(MapStorage::default()));
        assert_eq!(ctx.api_data_as::<u32>("limit").unwrap(), 5);
        assert!(matches!(
            ctx.api_data_as::<u32>("offset"),
            Err(PluginError::Runtime(_))
        ));
    }

    #[tokio::test]
    async fn plugin_state_lives_in_session_storage() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MapStorage::default());
        let plugin = CountingPlugin;
        plugin.customize(context(Arc::clone(&storage))).await.unwrap();
        let second = plugin.customize(context(Arc::clone(&storage))).await.unwrap();
        assert_eq!(second.headers["x-hits"], vec!["2".to_string()]);
        assert_eq!(second.content_as_str(), Some("{}"));
    }
}
