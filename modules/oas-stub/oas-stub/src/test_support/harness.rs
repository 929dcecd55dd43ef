//! Top-level test harness that wires all components together.

use std::sync::Arc;

use http::Method;
use oas_stub_sdk::{ApiDefinitions, ApiMetric, ApiRecord};

use super::request::RequestCase;
use crate::config::{OasStubConfig, RuntimeConfig};
use crate::domain::clock::Clock;
use crate::domain::plugin::PluginCompiler;
use crate::domain::services::ApiRegistrationService;
use crate::module::OasStubModule;

/// Fully-wired stub engine with in-memory storages behind an axum router.
pub struct AppHarness {
    module: OasStubModule,
    router: axum::Router,
}

impl AppHarness {
    pub fn builder() -> AppHarnessBuilder {
        AppHarnessBuilder::default()
    }

    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestCase<'_> {
        RequestCase::new(self, method, path)
    }

    pub fn get(&self, path: impl Into<String>) -> RequestCase<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl Into<String>) -> RequestCase<'_> {
        self.request(Method::POST, path)
    }

    pub fn registration(&self) -> Arc<dyn ApiRegistrationService> {
        self.module.registration()
    }

    pub fn module(&self) -> &OasStubModule {
        &self.module
    }

    pub fn metrics(&self, app: &str) -> Vec<ApiMetric> {
        self.module.observer().metrics(app)
    }

    pub fn records(&self, app: &str) -> Vec<ApiRecord> {
        self.module.recorder().records(app)
    }

    pub(crate) fn router(&self) -> &axum::Router {
        &self.router
    }
}

/// Builder for [`AppHarness`].
#[derive(Default)]
pub struct AppHarnessBuilder {
    config: OasStubConfig,
    clock: Option<Arc<dyn Clock>>,
    compilers: Vec<Arc<dyn PluginCompiler>>,
    applications: Vec<(String, ApiDefinitions)>,
}

impl AppHarnessBuilder {
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.config.prefix = prefix.to_owned();
        self
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.config.max_body_size_bytes = bytes;
        self
    }

    pub fn with_session_default_ttl(mut self, ttl: &str) -> Self {
        self.config.session_default_ttl = Some(ttl.to_owned());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn PluginCompiler>) -> Self {
        self.compilers.push(compiler);
        self
    }

    /// Register `definitions` under `name` once the harness is built.
    pub fn with_application(mut self, name: &str, definitions: ApiDefinitions) -> Self {
        self.applications.push((name.to_owned(), definitions));
        self
    }

    pub async fn build(self) -> AppHarness {
        let runtime = RuntimeConfig::try_from(&self.config).expect("valid harness config");
        let mut builder = OasStubModule::builder(runtime);
        if let Some(clock) = self.clock {
            builder = builder.with_clock(clock);
        }
        for compiler in self.compilers {
            builder = builder.with_compiler(compiler);
        }
        let module = builder.build();
        for (name, definitions) in self.applications {
            module
                .registration()
                .save_definitions(&name, definitions)
                .await
                .unwrap_or_else(|e| panic!("failed to register '{name}': {e}"));
        }
        let router = module.router();
        AppHarness { module, router }
    }
}
