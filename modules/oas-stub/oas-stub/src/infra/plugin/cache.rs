use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use oas_stub_sdk::{PluginDefinition, PluginError};

use crate::domain::clock::Clock;
use crate::domain::plugin::CompiledPlugin;

/// Compiled plugins keyed by definition value, expiring a fixed time after
/// they were written regardless of use.
pub struct PluginCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<PluginDefinition, (Arc<dyn CompiledPlugin>, Instant)>,
}

impl std::fmt::Debug for PluginCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl PluginCache {
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: DashMap::new(),
        }
    }

    /// Cached compiled form of `definition`, compiling on a miss or after
    /// expiry. A miss also evicts every expired entry. Failed compilations
    /// are not cached.
    ///
    /// # Errors
    /// Whatever `compile` returns.
    pub fn get_or_compile<F>(
        &self,
        definition: &PluginDefinition,
        compile: F,
    ) -> Result<Arc<dyn CompiledPlugin>, PluginError>
    where
        F: FnOnce(&str) -> Result<Arc<dyn CompiledPlugin>, PluginError>,
    {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(definition) {
            let (compiled, written_at) = entry.value();
            if now.saturating_duration_since(*written_at) < self.ttl {
                return Ok(Arc::clone(compiled));
            }
        }
        self.entries
            .retain(|_, (_, written_at)| now.saturating_duration_since(*written_at) < self.ttl);
        // Two requests may compile the same key concurrently; the last insert wins.
        let compiled = compile(&definition.script)?;
        self.entries
            .insert(definition.clone(), (Arc::clone(&compiled), now));
        Ok(compiled)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
