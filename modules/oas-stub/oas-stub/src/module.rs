use std::sync::Arc;

use anyhow::Context;
use oas_stub_sdk::SessionStorage;
use tracing::info;

use crate::api::rest::routes;
use crate::config::{OasStubConfig, RuntimeConfig};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::plugin::PluginCompiler;
use crate::domain::repo::{ApiDefinitionsRepository, ApiObserver, ApiRecorder};
use crate::domain::services::{ApiRegistrationService, StubService};
use crate::infra::plugin::{PluginCache, PluginCompilerRegistry, PluginPipeline};
use crate::infra::storage::{
    InMemoryApiDefinitionsRepository, InMemoryApiObserver, InMemoryApiRecorder,
    InMemorySessionStorage,
};
use crate::infra::stub::{ApiRegistrationServiceImpl, DocumentCache, StubServiceImpl};

/// Shared application state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) stub: Arc<dyn StubService>,
    pub(crate) config: RuntimeConfig,
}

/// Stub engine: wires storages, plugin pipeline, services and routes.
pub struct OasStubModule {
    state: AppState,
    registration: Arc<dyn ApiRegistrationService>,
    observer: Arc<dyn ApiObserver>,
    recorder: Arc<dyn ApiRecorder>,
    session: Arc<dyn SessionStorage>,
}

impl OasStubModule {
    #[must_use]
    pub fn builder(config: RuntimeConfig) -> OasStubModuleBuilder {
        OasStubModuleBuilder::new(config)
    }

    /// Build the module from configuration and register the configured
    /// applications.
    ///
    /// # Errors
    /// Fails on invalid durations, unreadable specification files or
    /// definitions the registration service rejects.
    pub async fn init(cfg: &OasStubConfig) -> anyhow::Result<Self> {
        info!("Initializing OAS stub module");
        let runtime = RuntimeConfig::try_from(cfg).context("invalid oas-stub configuration")?;
        info!(
            prefix = %runtime.prefix,
            plugin_cache_ttl = ?runtime.plugin_cache_ttl,
            max_body_size_bytes = runtime.max_body_size_bytes,
            "OAS stub config"
        );

        let module = Self::builder(runtime).build();
        for (name, source) in &cfg.definitions {
            let definitions = source
                .load()
                .with_context(|| format!("failed to load definitions for '{name}'"))?;
            module
                .registration
                .save_definitions(name, definitions)
                .await
                .with_context(|| format!("failed to register application '{name}'"))?;
        }
        info!(
            applications = cfg.definitions.len(),
            "OAS stub module initialized"
        );
        Ok(module)
    }

    /// Axum router serving the stub routes.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    #[must_use]
    pub fn registration(&self) -> Arc<dyn ApiRegistrationService> {
        Arc::clone(&self.registration)
    }

    #[must_use]
    pub fn stub_service(&self) -> Arc<dyn StubService> {
        Arc::clone(&self.state.stub)
    }

    #[must_use]
    pub fn observer(&self) -> Arc<dyn ApiObserver> {
        Arc::clone(&self.observer)
    }

    #[must_use]
    pub fn recorder(&self) -> Arc<dyn ApiRecorder> {
        Arc::clone(&self.recorder)
    }

    #[must_use]
    pub fn session_storage(&self) -> Arc<dyn SessionStorage> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.state.config
    }
}

/// Builder for [`OasStubModule`]. Every collaborator defaults to its
/// in-memory implementation.
pub struct OasStubModuleBuilder {
    config: RuntimeConfig,
    clock: Arc<dyn Clock>,
    compilers: Vec<Arc<dyn PluginCompiler>>,
    repository: Option<Arc<dyn ApiDefinitionsRepository>>,
    observer: Option<Arc<dyn ApiObserver>>,
    recorder: Option<Arc<dyn ApiRecorder>>,
}

impl OasStubModuleBuilder {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            compilers: Vec::new(),
            repository: None,
            observer: None,
            recorder: None,
        }
    }

    /// Time source for the plugin cache and session storage.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a plugin compiler next to the built-in ones.
    #[must_use]
    pub fn with_compiler(mut self, compiler: Arc<dyn PluginCompiler>) -> Self {
        self.compilers.push(compiler);
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: Arc<dyn ApiDefinitionsRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ApiObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ApiRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    #[must_use]
    pub fn build(self) -> OasStubModule {
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryApiDefinitionsRepository::new()));
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(InMemoryApiObserver::new()));
        let recorder = self
            .recorder
            .unwrap_or_else(|| Arc::new(InMemoryApiRecorder::new()));
        let session: Arc<dyn SessionStorage> =
            Arc::new(InMemorySessionStorage::new(Arc::clone(&self.clock)));

        // -- Plugin pipeline --
        let registry = self.compilers.into_iter().fold(
            PluginCompilerRegistry::with_builtins(self.config.session_default_ttl),
            PluginCompilerRegistry::with,
        );
        let cache = PluginCache::new(self.config.plugin_cache_ttl, self.clock);
        let plugins = PluginPipeline::new(registry, cache, Arc::clone(&session));

        // -- Services --
        let documents = Arc::new(DocumentCache::new());
        let registration: Arc<dyn ApiRegistrationService> = Arc::new(
            ApiRegistrationServiceImpl::new(Arc::clone(&repository), Arc::clone(&documents)),
        );
        let stub: Arc<dyn StubService> = Arc::new(
            StubServiceImpl::new(
                self.config.prefix.clone(),
                repository,
                plugins,
                Arc::clone(&observer),
                Arc::clone(&recorder),
            )
            .with_documents(documents),
        );

        OasStubModule {
            state: AppState {
                stub,
                config: self.config,
            },
            registration,
            observer,
            recorder,
            session,
        }
    }
}
