use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use regex::Regex;

use crate::domain::openapi::Schema;
use crate::domain::regexp::{self, Regexp};

/// Checks one named string `format`.
pub trait FormatValidator: Send + Sync {
    fn format(&self) -> &'static str;

    fn validate(&self, value: &str) -> bool;
}

// ---------------------------------------------------------------------------
// Built-in formats
// ---------------------------------------------------------------------------

struct RegexFormat {
    format: &'static str,
    regex: Option<Regex>,
}

impl RegexFormat {
    fn new(format: &'static str, pattern: &str) -> Self {
        Self {
            format,
            regex: Regex::new(pattern).ok(),
        }
    }
}

impl FormatValidator for RegexFormat {
    fn format(&self) -> &'static str {
        self.format
    }

    fn validate(&self, value: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(value))
    }
}

struct DateFormat;

impl FormatValidator for DateFormat {
    fn format(&self) -> &'static str {
        "date"
    }

    fn validate(&self, value: &str) -> bool {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
    }
}

/// RFC 3339, or a local date-time read as UTC.
struct DateTimeFormat;

impl FormatValidator for DateTimeFormat {
    fn format(&self) -> &'static str {
        "date-time"
    }

    fn validate(&self, value: &str) -> bool {
        DateTime::parse_from_rfc3339(value).is_ok()
            || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
    }
}

const UUID_PATTERN: &str =
    "^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

// ---------------------------------------------------------------------------
// Pattern cache
// ---------------------------------------------------------------------------

/// Parsed `pattern` strings. Unparsable patterns are cached as `None`.
#[derive(Default)]
pub struct PatternCache {
    parsed: DashMap<String, Option<Arc<Regexp>>>,
}

impl PatternCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, pattern: &str) -> Option<Arc<Regexp>> {
        if let Some(hit) = self.parsed.get(pattern) {
            return hit.clone();
        }
        let parsed = match regexp::parse(pattern) {
            Ok(node) => Some(Arc::new(node)),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "schema pattern cannot be parsed");
                None
            }
        };
        self.parsed.insert(pattern.to_owned(), parsed.clone());
        parsed
    }

    /// A pattern that fails to parse never matches.
    #[must_use]
    pub fn matches(&self, pattern: &str, value: &str) -> bool {
        self.get(pattern)
            .is_some_and(|node| regexp::is_match(&node, value))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Format validators selected by format name, plus the `pattern` check.
pub struct FormatValidators {
    validators: HashMap<&'static str, Arc<dyn FormatValidator>>,
    patterns: Arc<PatternCache>,
}

impl FormatValidators {
    /// Registry with `uuid`, `date`, `date-time` and `email`.
    #[must_use]
    pub fn with_builtins(patterns: Arc<PatternCache>) -> Self {
        let mut registry = Self {
            validators: HashMap::new(),
            patterns,
        };
        registry.register(Arc::new(RegexFormat::new("uuid", UUID_PATTERN)));
        registry.register(Arc::new(RegexFormat::new("email", EMAIL_PATTERN)));
        registry.register(Arc::new(DateFormat));
        registry.register(Arc::new(DateTimeFormat));
        registry
    }

    pub fn register(&mut self, validator: Arc<dyn FormatValidator>) {
        self.validators.insert(validator.format(), validator);
    }

    #[must_use]
    pub fn patterns(&self) -> &Arc<PatternCache> {
        &self.patterns
    }

    /// Check the schema's `format` (unknown formats pass) and `pattern`.
    #[must_use]
    pub fn check(&self, schema: &Schema<'_>, value: &str) -> bool {
        let format_ok = schema
            .format()
            .and_then(|f| self.validators.get(f))
            .is_none_or(|v| v.validate(value));
        let pattern_ok = schema
            .pattern()
            .is_none_or(|p| self.patterns.matches(p, value));
        format_ok && pattern_ok
    }
}

impl Default for FormatValidators {
    fn default() -> Self {
        Self::with_builtins(Arc::new(PatternCache::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(format: &str) -> Arc<dyn FormatValidator> {
        FormatValidators::default()
            .validators
            .get(format)
            .cloned()
            .unwrap()
    }

    #[test]
    fn uuid_accepts_both_cases() {
        let uuid = validator("uuid");
        assert!(uuid.validate("123e4567-e89b-42d3-a456-426614174000"));
        assert!(uuid.validate("123E4567-E89B-42D3-A456-426614174000"));
        assert!(!uuid.validate("123e4567-e89b-62d3-a456-426614174000"));
        assert!(!uuid.validate("not-a-uuid"));
    }

    #[test]
    fn dates_and_date_times() {
        let date = validator("date");
        assert!(date.validate("2024-02-29"));
        assert!(!date.validate("2023-02-29"));

        let date_time = validator("date-time");
        assert!(date_time.validate("2024-01-01T10:00:00Z"));
        assert!(date_time.validate("2024-01-01T10:00:00+09:00"));
        assert!(date_time.validate("2024-01-01T10:00:00"));
        assert!(!date_time.validate("2024-01-01"));
    }

    #[test]
    fn email_shape() {
        let email = validator("email");
        assert!(email.validate("example@example.com"));
        assert!(!email.validate("example.com"));
        assert!(!email.validate("a b@example.com"));
    }

    #[test]
    fn pattern_cache_rejects_unparsable_pattern() {
        let cache = PatternCache::new();
        assert!(cache.matches("\\d{3}", "123"));
        assert!(!cache.matches("(", "("));
        assert!(cache.get("(").is_none());
    }
}
