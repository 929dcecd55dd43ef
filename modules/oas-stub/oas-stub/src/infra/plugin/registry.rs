use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use oas_stub_sdk::PluginError;

use super::rhai_compiler::RhaiPluginCompiler;
use crate::domain::plugin::PluginCompiler;

/// Registry that resolves plugin type tags to compilers.
pub struct PluginCompilerRegistry {
    compilers: HashMap<String, Arc<dyn PluginCompiler>>,
}

impl std::fmt::Debug for PluginCompilerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCompilerRegistry")
            .field("types", &self.compilers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginCompilerRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            compilers: HashMap::new(),
        }
    }

    /// Create a registry with the built-in compilers (rhai).
    #[must_use]
    pub fn with_builtins(session_default_ttl: Duration) -> Self {
        Self::empty().with(Arc::new(RhaiPluginCompiler::new(session_default_ttl)))
    }

    /// Add a compiler, replacing any registered under the same type tag.
    #[must_use]
    pub fn with(mut self, compiler: Arc<dyn PluginCompiler>) -> Self {
        self.compilers
            .insert(compiler.plugin_type().to_owned(), compiler);
        self
    }

    /// Resolve a compiler by type tag.
    ///
    /// # Errors
    /// Returns `PluginError::UnsupportedType` if no compiler is registered.
    pub fn resolve(&self, plugin_type: &str) -> Result<Arc<dyn PluginCompiler>, PluginError> {
        self.compilers
            .get(plugin_type)
            .cloned()
            .ok_or_else(|| PluginError::UnsupportedType(plugin_type.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::plugin::rhai_compiler::RHAI_PLUGIN_TYPE;
    use crate::test_support::StaticPluginCompiler;

    #[test]
    fn resolves_rhai_compiler() {
        let registry = PluginCompilerRegistry::with_builtins(Duration::ZERO);
        assert!(registry.resolve(RHAI_PLUGIN_TYPE).is_ok());
    }

    #[test]
    fn registered_compiler_is_resolvable() {
        let registry = PluginCompilerRegistry::empty().with(Arc::new(StaticPluginCompiler::new()));
        assert_eq!(registry.resolve("static").unwrap().plugin_type(), "static");
    }

    #[test]
    fn unknown_type_returns_error() {
        let registry = PluginCompilerRegistry::with_builtins(Duration::ZERO);
        let err = registry.resolve("groovy").err();
        assert_eq!(err, Some(PluginError::UnsupportedType("groovy".to_owned())));
    }
}
