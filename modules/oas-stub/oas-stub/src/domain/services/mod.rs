use std::collections::BTreeMap;

use oas_stub_sdk::{ApiDefinitions, Body};
use tokio_util::sync::CancellationToken;

use crate::domain::error::DomainError;

/// Inbound request handed to the stub pipeline by a transport binding.
#[derive(Debug)]
pub struct StubRequest {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
    pub body: Body,
}

/// Response ready for the transport. `status` may lie outside the HTTP range
/// when a protocol error is injected.
#[derive(Debug)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Body,
}

#[derive(Debug)]
pub enum StubOutcome {
    Response(StubResponse),
    /// The connection must be dropped without a response.
    Aborted,
    /// No application is registered under the requested name.
    NotFound,
}

/// Runs one request through resolution, validation, synthesis, plugins and
/// failure/delay injection.
#[async_trait::async_trait]
pub trait StubService: Send + Sync {
    async fn handle(
        &self,
        request: StubRequest,
        cancel: CancellationToken,
    ) -> Result<StubOutcome, DomainError>;
}

/// Programmatic registration of applications.
#[async_trait::async_trait]
pub trait ApiRegistrationService: Send + Sync {
    /// Store `definitions` under `name`, replacing any previous value.
    ///
    /// # Errors
    /// `DomainError::InvalidDefinition` when the specification does not parse
    /// or a configuration key matches no operation.
    async fn save_definitions(
        &self,
        name: &str,
        definitions: ApiDefinitions,
    ) -> Result<(), DomainError>;

    async fn get_definitions(&self, name: &str) -> Result<Option<ApiDefinitions>, DomainError>;

    async fn delete_definitions(&self, name: &str) -> Result<ApiDefinitions, DomainError>;

    async fn names(&self) -> Result<Vec<String>, DomainError>;
}
