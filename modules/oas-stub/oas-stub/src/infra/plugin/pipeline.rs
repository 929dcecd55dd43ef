use std::sync::Arc;

use oas_stub_sdk::{
    ApiData, PluginContext, PluginDefinition, PluginError, RequestContext, ResponseContext,
    SessionStorage,
};
use tracing::{debug, info};

use super::cache::PluginCache;
use super::registry::PluginCompilerRegistry;

/// Compiles (through the cache) and runs the effective plugin of a request.
pub struct PluginPipeline {
    registry: PluginCompilerRegistry,
    cache: PluginCache,
    session: Arc<dyn SessionStorage>,
}

impl PluginPipeline {
    #[must_use]
    pub fn new(
        registry: PluginCompilerRegistry,
        cache: PluginCache,
        session: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            registry,
            cache,
            session,
        }
    }

    /// Customized response, or `response` unchanged when there is no plugin
    /// or the plugin fails at any step.
    pub async fn apply(
        &self,
        definition: Option<&PluginDefinition>,
        request: &RequestContext,
        response: ResponseContext,
        data: Option<&ApiData>,
    ) -> ResponseContext {
        let Some(definition) = definition else {
            return response;
        };
        match self
            .customize(definition, request, response.clone(), data)
            .await
        {
            Ok(customized) => {
                debug!(plugin_type = %definition.plugin_type, status = customized.status, "plugin applied");
                customized
            }
            Err(e) => {
                info!(
                    plugin_type = %definition.plugin_type,
                    api_path = %request.api_path,
                    error = %e,
                    "plugin failed, keeping synthesized response"
                );
                response
            }
        }
    }

    async fn customize(
        &self,
        definition: &PluginDefinition,
        request: &RequestContext,
        response: ResponseContext,
        data: Option<&ApiData>,
    ) -> Result<ResponseContext, PluginError> {
        let compiler = self.registry.resolve(&definition.plugin_type)?;
        let compiled = self
            .cache
            .get_or_compile(definition, |script| compiler.compile(script))?;
        let ctx = PluginContext::new(
            request.clone(),
            response,
            data.map(|d| d.0.clone()).unwrap_or_default(),
            Arc::clone(&self.session),
        );
        compiled.instantiate().customize(ctx).await
    }
}
