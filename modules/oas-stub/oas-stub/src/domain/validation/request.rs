use std::sync::Arc;

use oas_stub_sdk::RequestContext;
use serde_json::Value;

use super::format::FormatValidators;
use super::result::ValidationResult;
use super::schema::SchemaValidator;
use crate::domain::media;
use crate::domain::openapi::{Operation, Parameter, ParameterLocation, Schema, SchemaType};

/// What a request validator sees: the request, the matched operation and the
/// values bound to the template's path variables.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidationInput<'a> {
    pub request: &'a RequestContext,
    pub operation: Operation<'a>,
    pub path_variables: &'a [(String, String)],
}

pub trait RequestValidator: Send + Sync {
    fn validate(
        &self,
        input: &RequestValidationInput<'_>,
        schemas: &SchemaValidator<'_>,
    ) -> ValidationResult;
}

// ---------------------------------------------------------------------------
// Validator chain
// ---------------------------------------------------------------------------

/// Ordered set of request validators sharing one format registry.
pub struct RequestValidators {
    validators: Vec<Arc<dyn RequestValidator>>,
    formats: Arc<FormatValidators>,
}

impl RequestValidators {
    /// Parameters, path variables, security and body.
    #[must_use]
    pub fn standard(formats: Arc<FormatValidators>) -> Self {
        Self {
            validators: vec![
                Arc::new(ParameterValidator),
                Arc::new(PathVariableValidator),
                Arc::new(SecurityValidator),
                Arc::new(BodyValidator),
            ],
            formats,
        }
    }

    #[must_use]
    pub fn formats(&self) -> &Arc<FormatValidators> {
        &self.formats
    }

    /// Run every validator and merge the results. Disabled validation is
    /// always a success.
    #[must_use]
    pub fn validate(&self, input: &RequestValidationInput<'_>, enabled: bool) -> ValidationResult {
        if !enabled {
            return ValidationResult::success();
        }
        let schemas = SchemaValidator::new(input.operation.document().dialect(), &self.formats);
        self.validators
            .iter()
            .map(|v| v.validate(input, &schemas))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Header and query parameters.
pub struct ParameterValidator;

impl RequestValidator for ParameterValidator {
    fn validate(
        &self,
        input: &RequestValidationInput<'_>,
        schemas: &SchemaValidator<'_>,
    ) -> ValidationResult {
        input
            .operation
            .parameters()
            .iter()
            .map(|p| match p.location {
                ParameterLocation::Header => {
                    let values: Vec<Option<&str>> = input
                        .request
                        .header(p.name)
                        .unwrap_or_default()
                        .iter()
                        .map(|v| Some(v.as_str()))
                        .collect();
                    check_parameter(p, &values, "Header", schemas)
                }
                ParameterLocation::Query => {
                    let values: Vec<Option<&str>> = input
                        .request
                        .query(p.name)
                        .unwrap_or_default()
                        .iter()
                        .map(Option::as_deref)
                        .collect();
                    check_parameter(p, &values, "Query parameter", schemas)
                }
                ParameterLocation::Path | ParameterLocation::Cookie => ValidationResult::success(),
            })
            .collect()
    }
}

fn check_parameter(
    parameter: &Parameter<'_>,
    values: &[Option<&str>],
    label: &str,
    schemas: &SchemaValidator<'_>,
) -> ValidationResult {
    if values.is_empty() {
        return if parameter.required {
            ValidationResult::failed(
                format!("{label} '{}' is required", parameter.name),
                Some(parameter.name),
            )
        } else {
            ValidationResult::success()
        };
    }
    check_values(parameter, values, schemas)
}

fn check_values(
    parameter: &Parameter<'_>,
    values: &[Option<&str>],
    schemas: &SchemaValidator<'_>,
) -> ValidationResult {
    let Some(schema) = parameter.schema else {
        return ValidationResult::success();
    };
    values
        .iter()
        .map(|text| {
            let value = parameter_value(*text, &schema, schemas);
            schemas.check(&value, parameter.name, &schema)
        })
        .collect()
}

/// Integers and numbers are converted when the text parses, anything else
/// stays a string. A key without a value is `null`.
fn parameter_value(text: Option<&str>, schema: &Schema<'_>, schemas: &SchemaValidator<'_>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };
    let converted = match schemas.effective_type(schema) {
        SchemaType::Integer => serde_json::from_str::<Value>(text)
            .ok()
            .filter(|v| v.is_i64() || v.is_u64()),
        SchemaType::Number => serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_number),
        _ => None,
    };
    converted.unwrap_or_else(|| Value::String(text.to_owned()))
}

// ---------------------------------------------------------------------------
// Path variables
// ---------------------------------------------------------------------------

pub struct PathVariableValidator;

impl RequestValidator for PathVariableValidator {
    fn validate(
        &self,
        input: &RequestValidationInput<'_>,
        schemas: &SchemaValidator<'_>,
    ) -> ValidationResult {
        input
            .operation
            .parameters()
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
            .filter_map(|p| {
                let (_, value) = input
                    .path_variables
                    .iter()
                    .find(|(name, _)| name.as_str() == p.name)?;
                Some(check_values(p, &[Some(value.as_str())], schemas))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// `apiKey` and `http` basic/bearer schemes; other scheme types pass.
pub struct SecurityValidator;

impl RequestValidator for SecurityValidator {
    fn validate(
        &self,
        input: &RequestValidationInput<'_>,
        _schemas: &SchemaValidator<'_>,
    ) -> ValidationResult {
        let document = input.operation.document();
        input
            .operation
            .security()
            .iter()
            .flatten()
            .filter_map(|name| document.security_scheme(name))
            .map(|scheme| check_scheme(input.request, scheme))
            .collect()
    }
}

fn check_scheme(request: &RequestContext, scheme: &Value) -> ValidationResult {
    let field = |name: &str| scheme.get(name).and_then(Value::as_str);
    match field("type") {
        Some("apiKey") => {
            let Some(name) = field("name") else {
                return ValidationResult::success();
            };
            let (label, present) = match field("in") {
                Some("header") => ("Header", request.header(name).is_some()),
                Some("query") => ("Query parameter", request.query(name).is_some()),
                Some("cookie") => ("Cookie", request.cookies.contains_key(name)),
                _ => return ValidationResult::success(),
            };
            if present {
                ValidationResult::success()
            } else {
                ValidationResult::security_failed(format!("{label} '{name}' must exist"), Some(name))
            }
        }
        Some("http") => match field("scheme") {
            Some("basic" | "Basic") => check_authorization(request, "Basic"),
            Some("bearer" | "Bearer") => check_authorization(request, "Bearer"),
            _ => ValidationResult::success(),
        },
        _ => ValidationResult::success(),
    }
}

fn check_authorization(request: &RequestContext, scheme: &str) -> ValidationResult {
    let authorized = request
        .header("Authorization")
        .is_some_and(|values| values.iter().any(|v| v.starts_with(scheme)));
    if authorized {
        ValidationResult::success()
    } else {
        ValidationResult::security_failed(
            format!("'Authorization: {scheme}' header must exist"),
            Some(scheme),
        )
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

const BODYLESS_METHODS: [&str; 4] = ["GET", "HEAD", "OPTIONS", "DELETE"];

pub struct BodyValidator;

impl RequestValidator for BodyValidator {
    fn validate(
        &self,
        input: &RequestValidationInput<'_>,
        schemas: &SchemaValidator<'_>,
    ) -> ValidationResult {
        let request = input.request;
        if BODYLESS_METHODS.contains(&request.method.to_ascii_uppercase().as_str()) {
            return ValidationResult::success();
        }
        let Some(body) = input.operation.request_body() else {
            return ValidationResult::success();
        };
        let content_type = request
            .content_type
            .as_deref()
            .unwrap_or(media::APPLICATION_JSON);
        let declared = body
            .content
            .iter()
            .find(|m| media::same_essence(m.media_type, content_type));

        let Some(declared) = declared else {
            return match &request.content {
                Some(_) if body.required => {
                    ValidationResult::failed("Body with undefined content-type", None)
                }
                _ => ValidationResult::success(),
            };
        };
        let Some(content) = request.content.as_ref().filter(|c| !c.is_empty()) else {
            return if body.required {
                ValidationResult::failed("Empty body", None)
            } else {
                ValidationResult::success()
            };
        };
        match declared.schema {
            Some(schema) if media::is_json(declared.media_type) => {
                schemas.validate_json(content, &schema)
            }
            _ => ValidationResult::success(),
        }
    }
}
