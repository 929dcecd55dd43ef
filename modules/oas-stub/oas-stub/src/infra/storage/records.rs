use dashmap::DashMap;
use oas_stub_sdk::ApiRecord;

use crate::domain::repo::ApiRecorder;

#[derive(Debug, Default)]
pub struct InMemoryApiRecorder {
    records: DashMap<String, Vec<ApiRecord>>,
}

impl InMemoryApiRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApiRecorder for InMemoryApiRecorder {
    fn record(&self, app: &str, record: ApiRecord) {
        self.records.entry(app.to_owned()).or_default().push(record);
    }

    fn records(&self, app: &str) -> Vec<ApiRecord> {
        self.records
            .get(app)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn clear(&self, app: &str) {
        self.records.remove(app);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use oas_stub_sdk::{ApiRequestRecord, ApiResponseRecord};

    use super::*;

    fn record(path: &str) -> ApiRecord {
        ApiRecord {
            method: "POST".to_owned(),
            path: path.to_owned(),
            request: ApiRequestRecord {
                content_type: None,
                headers: BTreeMap::new(),
                cookies: BTreeMap::new(),
                body: None,
            },
            response: ApiResponseRecord {
                status: 200,
                content_type: None,
                headers: BTreeMap::new(),
                body: None,
            },
        }
    }

    #[test]
    fn keeps_records_in_order_per_application() {
        let recorder = InMemoryApiRecorder::new();
        recorder.record("petstore", record("/a"));
        recorder.record("petstore", record("/b"));
        recorder.record("bank", record("/c"));

        let paths: Vec<String> = recorder
            .records("petstore")
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);

        recorder.clear("petstore");
        assert!(recorder.records("petstore").is_empty());
        assert_eq!(recorder.records("bank").len(), 1);
    }
}
