use std::collections::HashMap;

use dashmap::DashMap;
use oas_stub_sdk::ApiMetric;

use crate::domain::repo::ApiObserver;

/// Metrics grouped by application, then by api path.
#[derive(Debug, Default)]
pub struct InMemoryApiObserver {
    metrics: DashMap<String, HashMap<String, Vec<ApiMetric>>>,
}

impl InMemoryApiObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn metrics_for_path(&self, app: &str, api_path: &str) -> Vec<ApiMetric> {
        self.metrics
            .get(app)
            .and_then(|paths| paths.get(api_path).cloned())
            .unwrap_or_default()
    }
}

impl ApiObserver for InMemoryApiObserver {
    fn record(&self, app: &str, metric: ApiMetric) {
        self.metrics
            .entry(app.to_owned())
            .or_default()
            .entry(metric.api_path.clone())
            .or_default()
            .push(metric);
    }

    fn metrics(&self, app: &str) -> Vec<ApiMetric> {
        let mut all: Vec<ApiMetric> = self
            .metrics
            .get(app)
            .map(|paths| paths.values().flatten().cloned().collect())
            .unwrap_or_default();
        all.sort_by_key(|m| m.request_timestamp);
        all
    }

    fn clear(&self) {
        self.metrics.clear();
    }
}
