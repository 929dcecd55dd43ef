use std::sync::Arc;

use oas_stub_sdk::{ApiPlugin, PluginError};

// ---------------------------------------------------------------------------
// Compiler ports
// ---------------------------------------------------------------------------

/// Turns plugin scripts of one type tag into reusable compiled forms.
pub trait PluginCompiler: Send + Sync {
    /// Type tag matched against `PluginDefinition::plugin_type`.
    fn plugin_type(&self) -> &str;

    /// # Errors
    /// Returns `PluginError::Compile` when the script is rejected.
    fn compile(&self, script: &str) -> Result<Arc<dyn CompiledPlugin>, PluginError>;
}

/// Cached, shareable result of a compilation.
pub trait CompiledPlugin: Send + Sync {
    /// A fresh runtime instance. Instances hold no state shared with others.
    fn instantiate(&self) -> Box<dyn ApiPlugin>;
}
