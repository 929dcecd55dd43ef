use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::{Map, Value};

use super::format::FormatValidators;
use super::result::ValidationResult;
use crate::domain::openapi::{
    AdditionalProperties, Dialect, Schema, SchemaDialect, SchemaType, ValueKind,
};

/// Name of the root property in validation details.
pub const ROOT_PROPERTY: &str = "$";

/// Checks JSON values against schemas of one dialect.
///
/// Every sibling property and element is checked, so a result lists all
/// failures rather than the first one.
pub struct SchemaValidator<'v> {
    dialect: &'static dyn SchemaDialect,
    formats: &'v FormatValidators,
}

impl<'v> SchemaValidator<'v> {
    #[must_use]
    pub fn new(dialect: Dialect, formats: &'v FormatValidators) -> Self {
        Self {
            dialect: dialect.adapter(),
            formats,
        }
    }

    #[must_use]
    pub fn effective_type(&self, schema: &Schema<'_>) -> SchemaType {
        self.dialect.effective_type(schema)
    }

    /// Parse `input` as JSON and check it from the root property.
    #[must_use]
    pub fn validate_json(&self, input: &[u8], schema: &Schema<'_>) -> ValidationResult {
        match serde_json::from_slice::<Value>(input) {
            Ok(value) => self.check(&value, ROOT_PROPERTY, schema),
            Err(e) => ValidationResult::failed(e.to_string(), None),
        }
    }

    #[must_use]
    pub fn check(&self, value: &Value, property: &str, schema: &Schema<'_>) -> ValidationResult {
        if let Some(result) = self.check_composed(value, property, schema) {
            return result;
        }
        let kind = ValueKind::of(value);
        if !self.dialect.admits(schema, kind) {
            return mismatch(self.dialect.effective_type(schema), value, property);
        }
        match value {
            Value::Null | Value::Bool(_) => ValidationResult::success(),
            Value::Number(_) => check_number_range(value, property, schema),
            Value::String(text) => self.check_text(text, property, schema),
            Value::Array(elements) => self.check_elements(elements, property, schema),
            Value::Object(fields) => {
                if self.dialect.effective_type(schema) == SchemaType::Any && !schema.has_properties() {
                    return ValidationResult::success();
                }
                let required = check_required(fields, property, schema);
                required.merge(self.check_properties(fields, property, schema))
            }
        }
    }

    fn check_composed(
        &self,
        value: &Value,
        property: &str,
        schema: &Schema<'_>,
    ) -> Option<ValidationResult> {
        if let Some(branches) = schema.any_of() {
            let satisfied = branches
                .iter()
                .any(|s| self.check(value, property, s).is_valid());
            return Some(if satisfied {
                ValidationResult::success()
            } else {
                ValidationResult::failed(
                    format!("{value} must satisfy at least one of {}", pretty(schema, "anyOf")),
                    Some(property),
                )
            });
        }
        if let Some(branches) = schema.one_of() {
            let satisfied = branches
                .iter()
                .filter(|s| self.check(value, property, s).is_valid())
                .count();
            return Some(if satisfied == 1 {
                ValidationResult::success()
            } else {
                ValidationResult::failed(
                    format!(
                        "{value} must satisfy only one of {}, but satisfied {satisfied}",
                        pretty(schema, "oneOf")
                    ),
                    Some(property),
                )
            });
        }
        let branches = schema.all_of()?;
        let satisfied = branches
            .iter()
            .all(|s| self.check(value, property, s).is_valid());
        Some(if satisfied {
            ValidationResult::success()
        } else {
            ValidationResult::failed(
                format!("{value} must satisfy all of {}", pretty(schema, "allOf")),
                Some(property),
            )
        })
    }

    fn check_properties(
        &self,
        fields: &Map<String, Value>,
        property: &str,
        schema: &Schema<'_>,
    ) -> ValidationResult {
        fields
            .iter()
            .map(|(name, value)| {
                let path = format!("{property}.{name}");
                if let Some(declared) = schema.property(name) {
                    return self.check(value, &path, &declared);
                }
                match schema.additional_properties() {
                    AdditionalProperties::Forbidden => {
                        ValidationResult::failed(format!("Unknown property {path}"), Some(path.as_str()))
                    }
                    AdditionalProperties::Permissive => ValidationResult::success(),
                    AdditionalProperties::Schema(extra) => self.check(value, &path, &extra),
                }
            })
            .collect()
    }

    fn check_elements(
        &self,
        elements: &[Value],
        property: &str,
        schema: &Schema<'_>,
    ) -> ValidationResult {
        let size = elements.len() as u64;
        if let Some(max) = schema.max_items()
            && size > max
        {
            return ValidationResult::failed(
                format!("At most {max} elements are allowed"),
                Some(property),
            );
        }
        if let Some(min) = schema.min_items()
            && size < min
        {
            return ValidationResult::failed(
                format!("At least {min} elements are required"),
                Some(property),
            );
        }
        let Some(items) = schema.items() else {
            return ValidationResult::success();
        };
        elements
            .iter()
            .enumerate()
            .map(|(i, element)| self.check(element, &format!("{property}[{i}]"), &items))
            .collect()
    }

    fn check_text(&self, text: &str, property: &str, schema: &Schema<'_>) -> ValidationResult {
        if !self.formats.check(schema, text) {
            return ValidationResult::failed(
                format!(
                    "Format error, format: {}, pattern: {}",
                    schema.format().unwrap_or("null"),
                    schema.pattern().unwrap_or("null")
                ),
                Some(property),
            );
        }
        match schema.enum_values() {
            Some(values) if !values.iter().any(|v| v.as_str() == Some(text)) => {
                ValidationResult::failed(
                    format!("Value must be one of the {}", enum_listing(values)),
                    Some(property),
                )
            }
            _ => ValidationResult::success(),
        }
    }
}

fn check_required(
    fields: &Map<String, Value>,
    property: &str,
    schema: &Schema<'_>,
) -> ValidationResult {
    schema
        .required()
        .into_iter()
        .filter(|name| !fields.contains_key(*name))
        .map(|name| {
            let path = format!("{property}.{name}");
            ValidationResult::failed("Missing required field", Some(path.as_str()))
        })
        .collect()
}

/// Bounds compare as exact decimals.
fn check_number_range(value: &Value, property: &str, schema: &Schema<'_>) -> ValidationResult {
    let Ok(actual) = BigDecimal::from_str(&value.to_string()) else {
        return mismatch(SchemaType::Number, value, property);
    };
    if let Some(max) = schema.maximum()
        && actual > max
    {
        return ValidationResult::failed(format!("Maximum value is {max}"), Some(property));
    }
    if let Some(min) = schema.minimum()
        && actual < min
    {
        return ValidationResult::failed(format!("Minimum value is {min}"), Some(property));
    }
    ValidationResult::success()
}

fn mismatch(expected: SchemaType, value: &Value, property: &str) -> ValidationResult {
    let noun = match expected {
        SchemaType::Object => "an object",
        SchemaType::Array => "an array",
        SchemaType::String => "a string",
        SchemaType::Number => "a number",
        SchemaType::Integer => "an integer",
        SchemaType::Boolean => "a boolean",
        SchemaType::Any => "a null",
    };
    ValidationResult::failed(format!("Not {noun} '{value}'"), Some(property))
}

fn pretty(schema: &Schema<'_>, keyword: &str) -> String {
    schema
        .raw()
        .get(keyword)
        .map(Value::to_string)
        .unwrap_or_default()
}

/// `[a, b, 3]`: strings unquoted, other values as JSON.
fn enum_listing(values: &[Value]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::openapi::OpenApiDocument;

    fn document(version: &str, schema: &Value) -> OpenApiDocument {
        OpenApiDocument::from_value(json!({
            "openapi": version,
            "components": {"schemas": {"S": schema}}
        }))
        .unwrap()
    }

    fn validate(version: &str, schema: &Value, value: &Value) -> ValidationResult {
        let doc = document(version, schema);
        let formats = FormatValidators::default();
        let root = json!({"$ref": "#/components/schemas/S"});
        let validator = SchemaValidator::new(doc.dialect(), &formats);
        validator.check(value, ROOT_PROPERTY, &doc.schema(&root))
    }

    fn messages(result: &ValidationResult) -> Vec<(String, Option<String>)> {
        result
            .details()
            .iter()
            .map(|d| (d.message.clone(), d.property.clone()))
            .collect()
    }

    #[test]
    fn one_of_rejects_double_match() {
        let schema = json!({"oneOf": [{"type": "integer"}, {"type": "number"}]});
        let result = validate("3.0.3", &schema, &json!(3));
        assert!(!result.is_valid());
        assert_eq!(result.details().len(), 1);
        assert!(result.details()[0].message.ends_with("but satisfied 2"));

        assert!(validate("3.0.3", &schema, &json!(3.5)).is_valid());
    }

    #[test]
    fn any_of_and_all_of() {
        let any = json!({"anyOf": [{"type": "string"}, {"type": "boolean"}]});
        assert!(validate("3.0.3", &any, &json!(true)).is_valid());
        let failed = validate("3.0.3", &any, &json!(1));
        assert!(failed.details()[0].message.starts_with("1 must satisfy at least one of"));

        let all = json!({"allOf": [{"type": "integer", "minimum": 1}, {"type": "integer", "maximum": 5}]});
        assert!(validate("3.0.3", &all, &json!(3)).is_valid());
        assert!(!validate("3.0.3", &all, &json!(6)).is_valid());
    }

    #[test]
    fn reports_every_object_failure() {
        let schema = json!({
            "type": "object",
            "required": ["id", "name"],
            "properties": {
                "id": {"type": "integer", "minimum": 1},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        });
        let result = validate(
            "3.0.3",
            &schema,
            &json!({"id": 0, "tags": ["a", 2], "extra": true}),
        );
        assert_eq!(
            messages(&result),
            vec![
                ("Missing required field".to_owned(), Some("$.name".to_owned())),
                ("Minimum value is 1".to_owned(), Some("$.id".to_owned())),
                ("Not a string '2'".to_owned(), Some("$.tags[1]".to_owned())),
                ("Unknown property $.extra".to_owned(), Some("$.extra".to_owned())),
            ]
        );
    }

    #[test]
    fn additional_properties_schema_applies() {
        let schema = json!({"type": "object", "additionalProperties": {"type": "integer"}});
        assert!(validate("3.0.3", &schema, &json!({"a": 1})).is_valid());
        let result = validate("3.0.3", &schema, &json!({"a": "x"}));
        assert_eq!(result.details()[0].property.as_deref(), Some("$.a"));
    }

    #[test]
    fn array_max_is_checked_before_min() {
        let schema = json!({"type": "array", "minItems": 5, "maxItems": 1, "items": {}});
        let result = validate("3.0.3", &schema, &json!([1, 2]));
        assert_eq!(result.details()[0].message, "At most 1 elements are allowed");
        let result = validate("3.0.3", &json!({"type": "array", "minItems": 2}), &json!([1]));
        assert_eq!(result.details()[0].message, "At least 2 elements are required");
    }

    #[test]
    fn decimal_bounds_are_exact() {
        let schema = json!({"type": "number", "maximum": 0.3});
        assert!(validate("3.0.3", &schema, &json!(0.3)).is_valid());
        let result = validate("3.0.3", &schema, &json!(0.30000000000000004));
        assert_eq!(result.details()[0].message, "Maximum value is 0.3");
    }

    #[test]
    fn strings_check_format_then_enum() {
        let uuid = json!({"type": "string", "format": "uuid", "enum": ["x"]});
        let result = validate("3.0.3", &uuid, &json!("nope"));
        assert_eq!(result.details()[0].message, "Format error, format: uuid, pattern: null");

        let colors = json!({"type": "string", "enum": ["red", "green"]});
        let result = validate("3.0.3", &colors, &json!("blue"));
        assert_eq!(result.details()[0].message, "Value must be one of the [red, green]");

        let phone = json!({"type": "string", "pattern": "\\d{3}-\\d{4}"});
        assert!(validate("3.0.3", &phone, &json!("555-1234")).is_valid());
        assert!(!validate("3.0.3", &phone, &json!("555-12345")).is_valid());
    }

    #[test]
    fn dialects_disagree_on_null() {
        let nullable = json!({"type": "string", "nullable": true});
        assert!(validate("3.0.3", &nullable, &Value::Null).is_valid());
        let result = validate("3.1.0", &nullable, &Value::Null);
        assert_eq!(result.details()[0].message, "Not a string 'null'");

        let listed = json!({"type": ["string", "null"]});
        assert!(validate("3.1.0", &listed, &Value::Null).is_valid());
        assert!(validate("3.1.0", &listed, &json!("a")).is_valid());
        let result = validate("3.1.0", &json!({"type": "null"}), &json!(1));
        assert_eq!(result.details()[0].message, "Not a null '1'");
    }

    #[test]
    fn integer_accepts_integral_numbers_only() {
        let schema = json!({"type": "integer"});
        assert!(validate("3.0.3", &schema, &json!(2.0)).is_valid());
        let result = validate("3.0.3", &schema, &json!(2.5));
        assert_eq!(result.details()[0].message, "Not an integer '2.5'");
    }

    #[test]
    fn untyped_schema_accepts_anything() {
        assert!(validate("3.0.3", &json!({}), &json!({"free": [1, 2]})).is_valid());
        assert!(validate("3.1.0", &json!({}), &json!("text")).is_valid());
    }

    #[test]
    fn unparsable_json_yields_single_detail() {
        let doc = document("3.0.3", &json!({"type": "object"}));
        let formats = FormatValidators::default();
        let root = json!({"$ref": "#/components/schemas/S"});
        let result = SchemaValidator::new(doc.dialect(), &formats)
            .validate_json(b"{oops", &doc.schema(&root));
        assert_eq!(result.details().len(), 1);
        assert!(result.details()[0].property.is_none());
    }
}
