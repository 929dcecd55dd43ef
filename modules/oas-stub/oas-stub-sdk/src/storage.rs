use std::time::Duration;

/// Key/value store shared by plugins across requests.
///
/// Synchronous because script engines call it from inside evaluation.
pub trait SessionStorage: Send + Sync {
    /// Store `value` under `key`. A zero `ttl` keeps the entry until deleted.
    fn put(&self, key: &str, value: serde_json::Value, ttl: Duration);

    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Remove `key`, returning the previous value if it was live.
    fn delete(&self, key: &str) -> Option<serde_json::Value>;
}
