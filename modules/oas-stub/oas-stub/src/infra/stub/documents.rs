use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::openapi::{OpenApiDocument, SpecError};

/// Parsed documents per application, reused while the stored specification
/// text is unchanged.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: DashMap<String, (String, Arc<OpenApiDocument>)>,
}

impl DocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns [`SpecError`] when `specification` does not parse.
    pub fn get(&self, app: &str, specification: &str) -> Result<Arc<OpenApiDocument>, SpecError> {
        if let Some(entry) = self.entries.get(app)
            && entry.0 == specification
        {
            return Ok(Arc::clone(&entry.1));
        }
        let document = Arc::new(OpenApiDocument::parse(specification)?);
        self.entries.insert(
            app.to_owned(),
            (specification.to_owned(), Arc::clone(&document)),
        );
        Ok(document)
    }

    pub fn evict(&self, app: &str) {
        self.entries.remove(app);
    }
}
