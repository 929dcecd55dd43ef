pub mod body;
pub mod error;
pub mod models;
pub mod plugin;
pub mod storage;

pub use body::Body;
pub use error::PluginError;
pub use models::{
    ApiConfiguration, ApiData, ApiDefinitions, ApiDelay, ApiFailure, ApiHeaders, ApiLatency,
    ApiMethodConfiguration, ApiMetric, ApiOptions, ApiRecord, ApiRequestRecord,
    ApiResponseRecord, DelayUnit, PluginDefinition,
};
pub use plugin::{ApiPlugin, PluginContext, RequestContext, ResponseContext};
pub use storage::SessionStorage;
