//! Bundled plugin compiler for `rhai` scripts.
//!
//! The script sees a `context` map (`#{request, response, data}`) and the
//! session functions `session_get`, `session_put`, `session_put_ttl` and
//! `session_delete`. It returns a response map
//! (`#{status, headers, contentType, content}`); missing keys keep the
//! pre-plugin values and returning `()` keeps the whole response.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use oas_stub_sdk::{
    ApiPlugin, PluginContext, PluginError, RequestContext, ResponseContext, SessionStorage,
};
use rhai::{AST, Dynamic, Engine, Scope};
use serde_json::{Value, json};

use crate::domain::plugin::{CompiledPlugin, PluginCompiler};

pub const RHAI_PLUGIN_TYPE: &str = "rhai";

/// Operations one script run may perform before it is aborted.
pub const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;
const MAX_CALL_LEVELS: usize = 64;

#[derive(Debug, Clone)]
pub struct RhaiPluginCompiler {
    session_default_ttl: Duration,
    max_operations: u64,
}

impl Default for RhaiPluginCompiler {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl RhaiPluginCompiler {
    /// `session_default_ttl` applies to `session_put`; zero keeps entries
    /// until deleted.
    #[must_use]
    pub fn new(session_default_ttl: Duration) -> Self {
        Self {
            session_default_ttl,
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }

    /// Scripts exceeding `max_operations` fail with a runtime error. Must be
    /// non-zero.
    #[must_use]
    pub fn with_max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = max_operations.max(1);
        self
    }
}

/// Engine with the limits every script runs under.
fn limited_engine(max_operations: u64) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(max_operations);
    engine.set_max_call_levels(MAX_CALL_LEVELS);
    engine
}

impl PluginCompiler for RhaiPluginCompiler {
    fn plugin_type(&self) -> &str {
        RHAI_PLUGIN_TYPE
    }

    fn compile(&self, script: &str) -> Result<Arc<dyn CompiledPlugin>, PluginError> {
        let ast = limited_engine(self.max_operations)
            .compile(script)
            .map_err(|e| PluginError::Compile(e.to_string()))?;
        Ok(Arc::new(RhaiCompiledPlugin {
            ast: Arc::new(ast),
            session_default_ttl: self.session_default_ttl,
            max_operations: self.max_operations,
        }))
    }
}

struct RhaiCompiledPlugin {
    ast: Arc<AST>,
    session_default_ttl: Duration,
    max_operations: u64,
}

impl CompiledPlugin for RhaiCompiledPlugin {
    fn instantiate(&self) -> Box<dyn ApiPlugin> {
        Box::new(RhaiPlugin {
            ast: Arc::clone(&self.ast),
            session_default_ttl: self.session_default_ttl,
            max_operations: self.max_operations,
        })
    }
}

struct RhaiPlugin {
    ast: Arc<AST>,
    session_default_ttl: Duration,
    max_operations: u64,
}

#[async_trait::async_trait]
impl ApiPlugin for RhaiPlugin {
    async fn customize(&self, ctx: PluginContext) -> Result<ResponseContext, PluginError> {
        let mut engine = limited_engine(self.max_operations);
        register_session_functions(&mut engine, ctx.session_storage(), self.session_default_ttl);
        let context = rhai::serde::to_dynamic(context_value(&ctx))
            .map_err(|e| PluginError::Runtime(e.to_string()))?;
        let mut scope = Scope::new();
        scope.push_dynamic("context", context);

        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(|e| PluginError::Runtime(e.to_string()))?;
        if result.is_unit() {
            return Ok(ctx.into_response());
        }
        let value: Value = rhai::serde::from_dynamic(&result)
            .map_err(|e| PluginError::InvalidResult(e.to_string()))?;
        apply_result(ctx.into_response(), value)
    }
}

// ---------------------------------------------------------------------------
// Engine setup
// ---------------------------------------------------------------------------

fn register_session_functions(
    engine: &mut Engine,
    storage: Arc<dyn SessionStorage>,
    default_ttl: Duration,
) {
    let get = Arc::clone(&storage);
    engine.register_fn("session_get", move |key: &str| -> Dynamic {
        get.get(key)
            .and_then(|v| rhai::serde::to_dynamic(v).ok())
            .unwrap_or(Dynamic::UNIT)
    });

    let put = Arc::clone(&storage);
    engine.register_fn("session_put", move |key: &str, value: Dynamic| {
        put.put(key, dynamic_to_value(&value), default_ttl);
    });

    let put_ttl = Arc::clone(&storage);
    engine.register_fn(
        "session_put_ttl",
        move |key: &str, value: Dynamic, ttl_millis: i64| {
            let ttl = Duration::from_millis(u64::try_from(ttl_millis).unwrap_or(0));
            put_ttl.put(key, dynamic_to_value(&value), ttl);
        },
    );

    engine.register_fn("session_delete", move |key: &str| -> Dynamic {
        storage
            .delete(key)
            .and_then(|v| rhai::serde::to_dynamic(v).ok())
            .unwrap_or(Dynamic::UNIT)
    });
}

fn dynamic_to_value(value: &Dynamic) -> Value {
    rhai::serde::from_dynamic(value).unwrap_or(Value::Null)
}

fn body_value(content: Option<&Bytes>) -> Value {
    content.map_or(Value::Null, |b| {
        Value::String(String::from_utf8_lossy(b).into_owned())
    })
}

fn request_value(request: &RequestContext) -> Value {
    json!({
        "applicationName": request.application_name,
        "apiPath": request.api_path,
        "method": request.method,
        "contentType": request.content_type,
        "content": body_value(request.content.as_ref()),
        "headers": request.headers,
        "cookies": request.cookies,
        "queryParameters": request.query_parameters,
    })
}

fn response_value(response: &ResponseContext) -> Value {
    json!({
        "status": response.status,
        "contentType": response.content_type,
        "content": body_value(response.content.as_ref()),
        "headers": response.headers,
    })
}

fn context_value(ctx: &PluginContext) -> Value {
    json!({
        "request": request_value(ctx.request()),
        "response": response_value(ctx.response()),
        "data": ctx.data(),
    })
}

// ---------------------------------------------------------------------------
// Result mapping
// ---------------------------------------------------------------------------

fn invalid(message: impl Into<String>) -> PluginError {
    PluginError::InvalidResult(message.into())
}

fn apply_result(mut response: ResponseContext, value: Value) -> Result<ResponseContext, PluginError> {
    let Value::Object(map) = value else {
        return Err(invalid("script must return a map or ()"));
    };
    if let Some(status) = map.get("status") {
        response.status = status
            .as_u64()
            .and_then(|s| u16::try_from(s).ok())
            .ok_or_else(|| invalid(format!("status {status} is not a valid status code")))?;
    }
    if let Some(content_type) = map.get("contentType") {
        response.content_type = match content_type {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => return Err(invalid(format!("contentType {other} is not a string"))),
        };
    }
    if let Some(headers) = map.get("headers") {
        response.headers = headers_from(headers)?;
    }
    if let Some(content) = map.get("content") {
        response.content = match content {
            Value::Null => None,
            Value::String(s) => Some(Bytes::from(s.clone())),
            other => Some(Bytes::from(other.to_string())),
        };
    }
    Ok(response)
}

fn headers_from(value: &Value) -> Result<BTreeMap<String, Vec<String>>, PluginError> {
    let Value::Object(map) = value else {
        return Err(invalid("headers must be a map"));
    };
    map.iter()
        .map(|(name, values)| Ok((name.clone(), header_values(name, values)?)))
        .collect()
}

fn header_values(name: &str, values: &Value) -> Result<Vec<String>, PluginError> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(invalid(format!("header {name} has a non-scalar value"))),
    };
    match values {
        Value::Array(items) => items.iter().map(scalar).collect(),
        single => Ok(vec![scalar(single)?]),
    }
}
