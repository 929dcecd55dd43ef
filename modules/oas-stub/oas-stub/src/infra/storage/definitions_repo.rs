use dashmap::DashMap;
use oas_stub_sdk::ApiDefinitions;

use crate::domain::repo::{ApiDefinitionsRepository, RepositoryError};

/// In-memory definitions store backed by `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryApiDefinitionsRepository {
    store: DashMap<String, ApiDefinitions>,
}

impl InMemoryApiDefinitionsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ApiDefinitionsRepository for InMemoryApiDefinitionsRepository {
    async fn get(&self, name: &str) -> Result<Option<ApiDefinitions>, RepositoryError> {
        Ok(self.store.get(name).map(|d| d.clone()))
    }

    async fn save(&self, name: &str, definitions: ApiDefinitions) -> Result<(), RepositoryError> {
        self.store.insert(name.to_owned(), definitions);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<ApiDefinitions, RepositoryError> {
        self.store
            .remove(name)
            .map(|(_, d)| d)
            .ok_or_else(|| RepositoryError::NotFound(name.to_owned()))
    }

    async fn names(&self) -> Result<Vec<String>, RepositoryError> {
        let mut names: Vec<String> = self.store.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        Ok(names)
    }
}
