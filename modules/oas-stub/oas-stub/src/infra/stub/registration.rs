use std::sync::Arc;

use oas_stub_sdk::ApiDefinitions;
use tracing::{info, warn};

use super::documents::DocumentCache;
use crate::domain::error::DomainError;
use crate::domain::openapi::OpenApiDocument;
use crate::domain::path::{adjust_base_path, find_matching_path};
use crate::domain::repo::ApiDefinitionsRepository;
use crate::domain::services::ApiRegistrationService;

/// Validates definitions before handing them to the repository.
pub struct ApiRegistrationServiceImpl {
    repository: Arc<dyn ApiDefinitionsRepository>,
    documents: Arc<DocumentCache>,
}

impl ApiRegistrationServiceImpl {
    #[must_use]
    pub fn new(
        repository: Arc<dyn ApiDefinitionsRepository>,
        documents: Arc<DocumentCache>,
    ) -> Self {
        Self {
            repository,
            documents,
        }
    }
}

/// Every configuration key must name an operation path of `document`.
fn check_configuration_keys(
    document: &OpenApiDocument,
    definitions: &ApiDefinitions,
) -> Result<(), DomainError> {
    let Some(configurations) = &definitions.configurations else {
        return Ok(());
    };
    let servers = document.declared_servers();
    for key in configurations.keys() {
        let resolved = adjust_base_path(key, &servers)
            .and_then(|path| find_matching_path(&path, document.path_templates()).map(|_| ()));
        if resolved.is_none() {
            return Err(DomainError::invalid_definition(format!(
                "configuration '{key}' matches no operation path"
            )));
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ApiRegistrationService for ApiRegistrationServiceImpl {
    async fn save_definitions(
        &self,
        name: &str,
        definitions: ApiDefinitions,
    ) -> Result<(), DomainError> {
        if let Some(specification) = &definitions.specification {
            let document = OpenApiDocument::parse(specification).map_err(|e| {
                warn!(app = %name, error = %e, "rejected specification");
                DomainError::invalid_definition(e.to_string())
            })?;
            check_configuration_keys(&document, &definitions)?;
        }
        self.repository.save(name, definitions).await?;
        self.documents.evict(name);
        info!(app = %name, "definitions saved");
        Ok(())
    }

    async fn get_definitions(&self, name: &str) -> Result<Option<ApiDefinitions>, DomainError> {
        Ok(self.repository.get(name).await?)
    }

    async fn delete_definitions(&self, name: &str) -> Result<ApiDefinitions, DomainError> {
        let removed = self.repository.delete(name).await?;
        self.documents.evict(name);
        info!(app = %name, "definitions deleted");
        Ok(removed)
    }

    async fn names(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.repository.names().await?)
    }
}
