use serde::Serialize;

/// Severity of a validation outcome. Merging keeps the greater one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ValidationResultType {
    #[default]
    Success,
    ValidationError,
    Security,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetail {
    pub message: String,
    pub property: Option<String>,
}

/// Outcome of one or more validators.
///
/// `merge` is associative with identity [`ValidationResult::success`], so
/// results can be folded in any grouping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    result_type: ValidationResultType,
    details: Vec<ValidationDetail>,
}

#[derive(Serialize)]
struct InvalidParam<'a> {
    name: &'a str,
    reason: &'a str,
}

#[derive(Serialize)]
struct ProblemDetails<'a> {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    status: u16,
    errors: Vec<InvalidParam<'a>>,
}

pub const PROBLEM_JSON: &str = "application/problem+json";

impl ValidationResult {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failed(message: impl Into<String>, property: Option<&str>) -> Self {
        Self::with_type(ValidationResultType::ValidationError, message, property)
    }

    #[must_use]
    pub fn security_failed(message: impl Into<String>, property: Option<&str>) -> Self {
        Self::with_type(ValidationResultType::Security, message, property)
    }

    fn with_type(
        result_type: ValidationResultType,
        message: impl Into<String>,
        property: Option<&str>,
    ) -> Self {
        Self {
            result_type,
            details: vec![ValidationDetail {
                message: message.into(),
                property: property.map(str::to_owned),
            }],
        }
    }

    #[must_use]
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.result_type = self.result_type.max(other.result_type);
        self.details.extend(other.details);
        self
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.result_type == ValidationResultType::Success
    }

    #[must_use]
    pub fn result_type(&self) -> ValidationResultType {
        self.result_type
    }

    #[must_use]
    pub fn details(&self) -> &[ValidationDetail] {
        &self.details
    }

    /// `application/problem+json` body, or `None` for a valid result.
    #[must_use]
    pub fn to_problem_details(&self, status: u16) -> Option<Vec<u8>> {
        if self.is_valid() {
            return None;
        }
        let problem = ProblemDetails {
            problem_type: "validation-error",
            title: "Validation error",
            status,
            errors: self
                .details
                .iter()
                .map(|d| InvalidParam {
                    name: d.property.as_deref().unwrap_or("N/A"),
                    reason: &d.message,
                })
                .collect(),
        };
        serde_json::to_vec(&problem).ok()
    }
}

impl FromIterator<ValidationResult> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationResult>>(iter: I) -> Self {
        iter.into_iter().fold(Self::success(), Self::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_greatest_type_and_all_details() {
        let a = ValidationResult::failed("Missing required field", Some("$.id"));
        let b = ValidationResult::security_failed("Header 'X-Key' must exist", Some("X-Key"));
        let merged = ValidationResult::success().merge(a.clone()).merge(b.clone());
        assert_eq!(merged.result_type(), ValidationResultType::Security);
        assert_eq!(merged.details().len(), 2);

        let c = ValidationResult::failed("Empty body", None);
        assert_eq!(
            a.clone().merge(b.clone()).merge(c.clone()),
            a.merge(b.merge(c))
        );
    }

    #[test]
    fn success_is_identity() {
        let a = ValidationResult::failed("Empty body", None);
        assert_eq!(ValidationResult::success().merge(a.clone()), a);
        assert_eq!(a.clone().merge(ValidationResult::success()), a);
    }

    #[test]
    fn problem_details_shape() {
        let result = ValidationResult::failed("Missing required field", Some("$.name"))
            .merge(ValidationResult::failed("Empty body", None));
        let body = result.to_problem_details(400).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "validation-error",
                "title": "Validation error",
                "status": 400,
                "errors": [
                    {"name": "$.name", "reason": "Missing required field"},
                    {"name": "N/A", "reason": "Empty body"}
                ]
            })
        );
        assert!(ValidationResult::success().to_problem_details(200).is_none());
    }
}
