/// Failure raised while compiling or running a response plugin.
///
/// Plugin errors never reach the client: the engine logs them and emits the
/// response it had before the plugin ran.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    #[error("unsupported plugin type: {0}")]
    UnsupportedType(String),

    #[error("plugin compilation failed: {0}")]
    Compile(String),

    #[error("plugin execution failed: {0}")]
    Runtime(String),

    #[error("plugin returned an invalid response: {0}")]
    InvalidResult(String),
}
