pub mod cache;
pub mod pipeline;
pub mod registry;
pub mod rhai_compiler;

pub use cache::PluginCache;
pub use pipeline::PluginPipeline;
pub use registry::PluginCompilerRegistry;
pub use rhai_compiler::{RHAI_PLUGIN_TYPE, RhaiPluginCompiler};
