//! In-process plugin doubles, registered under the `static` plugin type.

use std::collections::HashMap;
use std::sync::Arc;

use oas_stub_sdk::{ApiPlugin, PluginContext, PluginError, ResponseContext};

use crate::domain::plugin::{CompiledPlugin, PluginCompiler};

pub const STATIC_PLUGIN_TYPE: &str = "static";

#[derive(Debug, Clone)]
enum Behavior {
    Passthrough,
    Respond(ResponseContext),
    Fail(String),
}

/// Compiled plugin with fixed behavior.
#[derive(Debug, Clone)]
pub struct StaticPlugin {
    behavior: Behavior,
}

impl StaticPlugin {
    /// Returns the response it was given.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            behavior: Behavior::Passthrough,
        }
    }

    /// Replaces the response with `response`.
    #[must_use]
    pub fn responding(response: ResponseContext) -> Self {
        Self {
            behavior: Behavior::Respond(response),
        }
    }

    /// Fails at runtime with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            behavior: Behavior::Fail(message.to_owned()),
        }
    }
}

impl CompiledPlugin for StaticPlugin {
    fn instantiate(&self) -> Box<dyn ApiPlugin> {
        Box::new(StaticPluginInstance {
            behavior: self.behavior.clone(),
        })
    }
}

struct StaticPluginInstance {
    behavior: Behavior,
}

#[async_trait::async_trait]
impl ApiPlugin for StaticPluginInstance {
    async fn customize(&self, ctx: PluginContext) -> Result<ResponseContext, PluginError> {
        match &self.behavior {
            Behavior::Passthrough => Ok(ctx.into_response()),
            Behavior::Respond(response) => Ok(response.clone()),
            Behavior::Fail(message) => Err(PluginError::Runtime(message.clone())),
        }
    }
}

/// Compiler resolving scripts by name to pre-built [`StaticPlugin`]s.
/// Unknown scripts fail to compile.
#[derive(Debug, Default)]
pub struct StaticPluginCompiler {
    scripts: HashMap<String, StaticPlugin>,
}

impl StaticPluginCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(mut self, script: &str, plugin: StaticPlugin) -> Self {
        self.scripts.insert(script.to_owned(), plugin);
        self
    }
}

impl PluginCompiler for StaticPluginCompiler {
    fn plugin_type(&self) -> &str {
        STATIC_PLUGIN_TYPE
    }

    fn compile(&self, script: &str) -> Result<Arc<dyn CompiledPlugin>, PluginError> {
        self.scripts
            .get(script)
            .map(|plugin| Arc::new(plugin.clone()) as Arc<dyn CompiledPlugin>)
            .ok_or_else(|| PluginError::Compile(format!("unknown static script '{script}'")))
    }
}
