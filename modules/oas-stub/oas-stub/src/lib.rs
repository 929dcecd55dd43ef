// === PUBLIC API (from SDK) ===
pub use oas_stub_sdk::{
    ApiConfiguration, ApiData, ApiDefinitions, ApiDelay, ApiFailure, ApiHeaders, ApiLatency,
    ApiMethodConfiguration, ApiMetric, ApiOptions, ApiPlugin, ApiRecord, Body, DelayUnit,
    PluginContext, PluginDefinition, PluginError, RequestContext, ResponseContext,
    SessionStorage,
};

// === MODULE DEFINITION ===
pub mod module;
pub use module::{AppState, OasStubModule, OasStubModuleBuilder};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
