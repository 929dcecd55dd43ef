use oas_stub_sdk::{ApiDefinitions, ApiMetric, ApiRecord};

/// Errors from definition storage.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application '{0}' not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage: {0}")]
    Internal(String),
}

/// Storage of registered applications. Values are replaced whole on save.
#[async_trait::async_trait]
pub trait ApiDefinitionsRepository: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<ApiDefinitions>, RepositoryError>;

    async fn save(&self, name: &str, definitions: ApiDefinitions) -> Result<(), RepositoryError>;

    /// Remove an application, returning its last definitions.
    async fn delete(&self, name: &str) -> Result<ApiDefinitions, RepositoryError>;

    async fn names(&self) -> Result<Vec<String>, RepositoryError>;
}

// ---------------------------------------------------------------------------
// Monitoring sinks
// ---------------------------------------------------------------------------

/// Metrics sink. Fire-and-forget: recording never fails the request.
pub trait ApiObserver: Send + Sync {
    fn record(&self, app: &str, metric: ApiMetric);

    fn metrics(&self, app: &str) -> Vec<ApiMetric>;

    fn clear(&self);
}

/// Sink for captured request/response pairs.
pub trait ApiRecorder: Send + Sync {
    fn record(&self, app: &str, record: ApiRecord);

    fn records(&self, app: &str) -> Vec<ApiRecord>;

    fn clear(&self, app: &str);
}
