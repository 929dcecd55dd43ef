use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use oas_stub_sdk::ApiDefinitions;
use serde::{Deserialize, Serialize};

/// Configuration for the stub engine.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OasStubConfig {
    /// Path prefix in front of `/{application}/...`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Compiled plugins are recompiled this long after compilation.
    #[serde(default = "default_plugin_cache_ttl")]
    pub plugin_cache_ttl: String,
    #[serde(default = "default_max_body_size_bytes")]
    pub max_body_size_bytes: usize,
    /// TTL applied by `session_put` in scripts. Absent keeps entries until deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_default_ttl: Option<String>,
    /// Applications registered at startup.
    #[serde(default)]
    pub definitions: BTreeMap<String, DefinitionSource>,
}

/// Inline definitions, optionally reading the specification from a file.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_file: Option<PathBuf>,
    #[serde(flatten)]
    pub definitions: ApiDefinitions,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid duration '{value}' for {field}: {source}")]
    Duration {
        field: &'static str,
        value: String,
        source: humantime::DurationError,
    },

    #[error("failed to read specification file {path}: {source}")]
    SpecificationFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Default for OasStubConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            plugin_cache_ttl: default_plugin_cache_ttl(),
            max_body_size_bytes: default_max_body_size_bytes(),
            session_default_ttl: None,
            definitions: BTreeMap::new(),
        }
    }
}

fn default_prefix() -> String {
    "/oas".to_owned()
}

fn default_plugin_cache_ttl() -> String {
    "1h".to_owned()
}

fn default_max_body_size_bytes() -> usize {
    10 * 1024 * 1024 // 10 MB
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|source| ConfigError::Duration {
        field,
        value: value.to_owned(),
        source,
    })
}

impl DefinitionSource {
    /// Definitions with the specification file, if any, read in.
    ///
    /// # Errors
    /// Returns [`ConfigError::SpecificationFile`] when the file cannot be read.
    pub fn load(&self) -> Result<ApiDefinitions, ConfigError> {
        let mut definitions = self.definitions.clone();
        if let Some(path) = &self.specification_file {
            let text = std::fs::read_to_string(path).map_err(|source| {
                ConfigError::SpecificationFile {
                    path: path.clone(),
                    source,
                }
            })?;
            definitions.specification = Some(text);
        }
        Ok(definitions)
    }
}

/// Read-only runtime configuration exposed to handlers via `AppState`.
///
/// Derived from [`OasStubConfig`] at init time, excluding the startup
/// definitions.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub prefix: String,
    pub plugin_cache_ttl: Duration,
    pub max_body_size_bytes: usize,
    pub session_default_ttl: Duration,
}

impl TryFrom<&OasStubConfig> for RuntimeConfig {
    type Error = ConfigError;

    fn try_from(cfg: &OasStubConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            prefix: cfg.prefix.trim_end_matches('/').to_owned(),
            plugin_cache_ttl: parse_duration("plugin_cache_ttl", &cfg.plugin_cache_ttl)?,
            max_body_size_bytes: cfg.max_body_size_bytes,
            session_default_ttl: cfg
                .session_default_ttl
                .as_deref()
                .map(|v| parse_duration("session_default_ttl", v))
                .transpose()?
                .unwrap_or(Duration::ZERO),
        })
    }
}

impl fmt::Debug for OasStubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OasStubConfig")
            .field("prefix", &self.prefix)
            .field("plugin_cache_ttl", &self.plugin_cache_ttl)
            .field("max_body_size_bytes", &self.max_body_size_bytes)
            .field("session_default_ttl", &self.session_default_ttl)
            .field(
                "definitions",
                &self
                    .definitions
                    .iter()
                    .map(|(name, source)| (name.as_str(), source))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Debug for DefinitionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionSource")
            .field("specification_file", &self.specification_file)
            .field(
                "specification_bytes",
                &self.definitions.specification.as_ref().map(String::len),
            )
            .field(
                "configurations",
                &self.definitions.configurations.as_ref().map(BTreeMap::len),
            )
            .finish_non_exhaustive()
    }
}
